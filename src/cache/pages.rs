//! Cursor-following page drain with a hard ceiling.

use tracing::debug;

use crate::error::{CacheError, Result};
use crate::filter::FilterDescriptor;
use crate::transport::{CollectionId, Cursor, RawRecord, Transport};

/// Upper bounds on a single drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
  pub max_pages: usize,
  pub max_items: Option<usize>,
}

impl Default for PageLimits {
  fn default() -> Self {
    Self {
      max_pages: 100,
      max_items: None,
    }
  }
}

/// Fetch pages in order until the source stops returning a cursor.
///
/// Fails as a whole on the first page error; partial results are discarded.
pub(crate) async fn drain_pages(
  transport: &dyn Transport,
  collection: &CollectionId,
  filter: &FilterDescriptor,
  limits: PageLimits,
) -> Result<Vec<RawRecord>> {
  let mut items = Vec::new();
  let mut cursor: Option<Cursor> = None;
  let mut pages = 0usize;

  loop {
    let page = transport
      .get_page(collection, filter, cursor.as_ref())
      .await?;
    pages += 1;
    items.extend(page.items);

    debug!(
      collection = %collection,
      page = pages,
      items = items.len(),
      more = page.next_cursor.is_some(),
      "fetched page"
    );

    let over_items = limits.max_items.is_some_and(|max| items.len() > max);
    let Some(next) = page.next_cursor else {
      if over_items {
        return Err(limit_error(collection, pages, items.len()));
      }
      break;
    };
    if over_items || pages >= limits.max_pages {
      return Err(limit_error(collection, pages, items.len()));
    }
    cursor = Some(next);
  }

  Ok(items)
}

fn limit_error(collection: &CollectionId, pages: usize, items: usize) -> CacheError {
  CacheError::PageLimitExceeded {
    collection: collection.to_string(),
    pages,
    items,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::transport::testing::ScriptedTransport;
  use crate::transport::Page;

  fn raw(id: &str) -> RawRecord {
    RawRecord::new(id)
  }

  #[tokio::test]
  async fn test_follows_cursors_in_order() {
    let transport = ScriptedTransport::new();
    transport.push_page("t", Ok(Page::new(vec![raw("a")], Some(Cursor::new("c1")))));
    transport.push_page("t", Ok(Page::new(vec![raw("b")], Some(Cursor::new("c2")))));
    transport.push_page("t", Ok(Page::last(vec![raw("c")])));

    let items = drain_pages(
      &transport,
      &CollectionId::new("t"),
      &FilterDescriptor::default(),
      PageLimits::default(),
    )
    .await
    .unwrap();

    let ids: Vec<&str> = items.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(transport.page_calls(), 3);
    assert_eq!(
      *transport.cursors_seen.lock().unwrap(),
      vec![None, Some("c1".to_string()), Some("c2".to_string())]
    );
  }

  #[tokio::test]
  async fn test_page_ceiling() {
    let transport = ScriptedTransport::new();
    for i in 0..5 {
      transport.push_page(
        "t",
        Ok(Page::new(vec![raw(&format!("r{i}"))], Some(Cursor::new(format!("c{i}"))))),
      );
    }

    let limits = PageLimits {
      max_pages: 3,
      max_items: None,
    };
    let err = drain_pages(&transport, &CollectionId::new("t"), &FilterDescriptor::default(), limits)
      .await
      .unwrap_err();

    assert_eq!(
      err,
      CacheError::PageLimitExceeded {
        collection: "t".to_string(),
        pages: 3,
        items: 3,
      }
    );
    assert_eq!(transport.page_calls(), 3);
  }

  #[tokio::test]
  async fn test_item_ceiling() {
    let transport = ScriptedTransport::new();
    transport.push_page(
      "t",
      Ok(Page::new(vec![raw("a"), raw("b")], Some(Cursor::new("c1")))),
    );
    transport.push_page("t", Ok(Page::last(vec![raw("c")])));

    let limits = PageLimits {
      max_pages: 10,
      max_items: Some(2),
    };
    let err = drain_pages(&transport, &CollectionId::new("t"), &FilterDescriptor::default(), limits)
      .await
      .unwrap_err();

    assert!(matches!(err, CacheError::PageLimitExceeded { items: 3, .. }));
  }

  #[tokio::test]
  async fn test_page_error_discards_partial_results() {
    let transport = ScriptedTransport::new();
    transport.push_page("t", Ok(Page::new(vec![raw("a")], Some(Cursor::new("c1")))));
    transport.push_page("t", Err(CacheError::transport(Some(503), "unavailable")));

    let err = drain_pages(
      &transport,
      &CollectionId::new("t"),
      &FilterDescriptor::default(),
      PageLimits::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), Some(503));
  }
}
