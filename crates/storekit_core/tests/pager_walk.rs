use storekit_core::{last_page_tag, walk, ErrorKind, PageStep, Pager, PagerOptions, RepoError, Tag};

fn count_fetches(page_size: i32, total: i64) -> (usize, Vec<i32>) {
    let mut pages = Vec::new();
    walk(page_size, |page| {
        pages.push(page);
        Ok(total)
    })
    .unwrap();
    (pages.len(), pages)
}

#[test]
fn walk_visits_each_page_once() {
    assert_eq!(count_fetches(10, 7).0, 1);
    assert_eq!(count_fetches(10, 60).0, 6);

    let (calls, pages) = count_fetches(10, 55);
    assert_eq!(calls, 6);
    assert_eq!(pages, vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn walk_with_empty_result_fetches_once() {
    assert_eq!(count_fetches(10, 0).0, 1);
}

#[test]
fn walk_stops_on_first_fetch_error() {
    let mut calls = 0;
    let err = walk(10, |page| {
        calls += 1;
        if page == 2 {
            return Err(RepoError::conflict("boom"));
        }
        Ok(100)
    })
    .unwrap_err();

    assert_eq!(calls, 2);
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn offset_and_total_pages_follow_page_cursor() {
    let mut pager = Pager::with_page_size(4, 25);
    assert_eq!(pager.offset(), 75);
    assert_eq!(pager.limit(), 25);
    assert_eq!(pager.total_pages(), 0);

    pager.set_total_items(0);
    assert_eq!(pager.total_pages(), 0);
    pager.set_total_items(1);
    assert_eq!(pager.total_pages(), 1);
    pager.set_total_items(100);
    assert_eq!(pager.total_pages(), 4);
    pager.set_total_items(101);
    assert_eq!(pager.total_pages(), 5);
}

#[test]
fn next_page_requires_total() {
    let mut pager = Pager::with_page_size(1, 10);
    let err = pager.next_page().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(!last_page_tag().is_tagged(&err));
}

#[test]
fn next_page_reports_done_on_last_page() {
    let mut pager = Pager::with_page_size(6, 10);
    pager.set_total_items(60);
    assert_eq!(pager.next_page().unwrap(), PageStep::Done);
    assert_eq!(pager.page(), 6);

    let mut pager = Pager::with_page_size(5, 10);
    pager.set_total_items(60);
    assert_eq!(pager.next_page().unwrap(), PageStep::MorePages);
    assert_eq!(pager.page(), 6);
}

#[test]
fn advance_tags_last_page_error() {
    let mut pager = Pager::with_page_size(6, 10);
    pager.set_total_items(60);
    let err = pager.advance().unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(last_page_tag().is_tagged(&err));
    assert!(!Tag::new("last_page").is_tagged(&err));

    let mut pager = Pager::with_page_size(5, 10);
    pager.set_total_items(60);
    pager.advance().unwrap();
    assert_eq!(pager.page(), 6);
}

#[test]
fn options_clamp_page_size() {
    let options = PagerOptions::default().with_max_page_size(50).with_page_size(80);
    let pager = Pager::new(2, &options);
    assert_eq!(pager.page_size(), 50);
    assert_eq!(pager.offset(), 50);
}
