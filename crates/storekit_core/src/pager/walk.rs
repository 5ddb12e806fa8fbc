use super::{PageStep, Pager};
use crate::error::RepoResult;
use log::debug;

/// Visits pages starting at page 1 until the last page is reached.
///
/// `fetch` receives the current page number and returns the total item count
/// it observed. The first error from `fetch` stops the walk and is returned.
pub fn walk<F>(page_size: i32, mut fetch: F) -> RepoResult<()>
where
    F: FnMut(i32) -> RepoResult<i64>,
{
    let mut pager = Pager::with_page_size(1, page_size);
    loop {
        let total = fetch(pager.page())?;
        pager.set_total_items(clamp_total(total));
        if pager.next_page()? == PageStep::Done {
            debug!(
                "event=walk_done module=pager status=ok pages={} page_size={}",
                pager.page(),
                pager.page_size()
            );
            return Ok(());
        }
    }
}

fn clamp_total(total: i64) -> i32 {
    i32::try_from(total.max(0)).unwrap_or(i32::MAX)
}
