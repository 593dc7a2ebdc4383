//! Landing page.

use super::{render, Page, PageContext};

/// GET / - Landing page.
pub async fn landing(ctx: PageContext) -> Page<()> {
    render(ctx, "landing", ())
}
