//! Paginated, deduplicated message history.
//!
//! The store hands back the raw message/attachment join, so a message with
//! N attachments arrives as N rows. One page is built as follows:
//!
//! 1. fetch `limit + 1` rows (or messages, see [`WindowUnit`]) from `start`
//! 2. group rows by message id, keeping first-seen parent fields and each
//!    distinct attachment id once
//! 3. re-sort by `(timestamp, creation)` descending
//! 4. `has_more` is the `limit + 1` sentinel, then truncate to `limit`
//! 5. batch-resolve attachments and sender names (one call each)
//!
//! In [`WindowUnit::RawRows`] mode the sentinel counts raw rows, so a page
//! whose extra row belongs to a message already on the page reports
//! `has_more = true` even when nothing follows. [`WindowUnit::Messages`]
//! counts grouped messages instead.

use super::{AttachmentResolver, IdentityResolver, MessageSource, RowWindow, SourceError, WindowUnit};
use crate::db::RawMessageRow;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum PageError {
    #[error("conversation id must not be empty")]
    EmptyConversation,
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Attachment metadata as resolved for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAttachment {
    pub id: String,
    pub display_name: String,
    pub url: String,
    pub is_private: bool,
}

/// One grouped, enriched message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMessage {
    pub id: String,
    pub conversation: String,
    pub author_id: String,
    /// Resolved display name, or `author_id` when nothing resolved.
    pub sender_full_name: String,
    pub content: Option<String>,
    pub timestamp: i64,
    pub creation: i64,
    pub attachments: Vec<ResolvedAttachment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub messages: Vec<PageMessage>,
    pub has_more: bool,
}

/// A message collapsed from its raw rows, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GroupedMessage {
    pub id: String,
    pub author_id: String,
    pub content: Option<String>,
    pub timestamp: i64,
    pub creation: i64,
    pub attachment_ids: Vec<String>,
}

/// Collapse raw rows into messages in first-seen order.
pub(crate) fn group_rows(rows: Vec<RawMessageRow>) -> Vec<GroupedMessage> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut grouped: Vec<GroupedMessage> = Vec::new();

    for row in rows {
        let slot = match index.get(&row.message_id) {
            Some(&i) => i,
            None => {
                index.insert(row.message_id.clone(), grouped.len());
                grouped.push(GroupedMessage {
                    id: row.message_id,
                    author_id: row.author_id,
                    content: row.content,
                    timestamp: row.timestamp,
                    creation: row.creation,
                    attachment_ids: Vec::new(),
                });
                grouped.len() - 1
            }
        };

        if let Some(attachment) = row.attachment_id
            && !grouped[slot].attachment_ids.contains(&attachment)
        {
            grouped[slot].attachment_ids.push(attachment);
        }
    }

    grouped
}

/// Newest first; `sort_by` is stable so full ties keep store order.
fn sort_newest_first(messages: &mut [GroupedMessage]) {
    messages.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.creation.cmp(&a.creation))
    });
}

/// Ids in first-seen order without repeats.
fn distinct<'a>(ids: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Builds history pages from a [`MessageSource`] and the two resolvers.
#[derive(Clone)]
pub struct Paginator {
    source: Arc<dyn MessageSource>,
    attachments: Arc<dyn AttachmentResolver>,
    identities: Arc<dyn IdentityResolver>,
    default_page_size: u32,
    max_page_size: u32,
    unit: WindowUnit,
}

impl Paginator {
    pub const DEFAULT_PAGE_SIZE: u32 = 50;
    pub const MAX_PAGE_SIZE: u32 = 500;

    pub fn new(
        source: Arc<dyn MessageSource>,
        attachments: Arc<dyn AttachmentResolver>,
        identities: Arc<dyn IdentityResolver>,
    ) -> Self {
        Self {
            source,
            attachments,
            identities,
            default_page_size: Self::DEFAULT_PAGE_SIZE,
            max_page_size: Self::MAX_PAGE_SIZE,
            unit: WindowUnit::RawRows,
        }
    }

    pub fn with_page_sizes(mut self, default_page_size: u32, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size.max(1);
        self.default_page_size = default_page_size.clamp(1, self.max_page_size);
        self
    }

    pub fn with_unit(mut self, unit: WindowUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Apply defaults and bounds: `limit <= 0` becomes the default page
    /// size, `limit` is capped at the maximum, `start < 0` becomes 0.
    pub fn normalize(&self, limit: i64, start: i64) -> (u32, u32) {
        let limit = if limit <= 0 {
            self.default_page_size
        } else {
            u32::try_from(limit)
                .unwrap_or(u32::MAX)
                .min(self.max_page_size)
        };
        let start = u32::try_from(start.max(0)).unwrap_or(u32::MAX);
        (limit, start)
    }

    /// Fetch one page of a conversation, newest first.
    pub async fn fetch_page(
        &self,
        conversation: &str,
        limit: i64,
        start: i64,
    ) -> Result<Page, PageError> {
        if conversation.is_empty() {
            return Err(PageError::EmptyConversation);
        }

        let (limit, start) = self.normalize(limit, start);
        let fetch_limit = limit.saturating_add(1);

        let rows = self
            .source
            .fetch_rows(
                conversation,
                RowWindow {
                    offset: start,
                    limit: fetch_limit,
                    unit: self.unit,
                },
            )
            .await?;

        let raw_count = rows.len();
        crate::metrics::record_page_rows(raw_count);

        let mut grouped = group_rows(rows);
        sort_newest_first(&mut grouped);

        let has_more = match self.unit {
            WindowUnit::RawRows => raw_count >= fetch_limit as usize,
            WindowUnit::Messages => grouped.len() >= fetch_limit as usize,
        };
        grouped.truncate(limit as usize);

        debug!(
            conversation = %conversation,
            start,
            limit,
            raw_rows = raw_count,
            messages = grouped.len(),
            has_more,
            "history page built"
        );

        let messages = self.resolve(conversation, grouped).await;
        Ok(Page { messages, has_more })
    }

    /// Attach resolved metadata. Resolver failures degrade to empty lookups.
    async fn resolve(&self, conversation: &str, grouped: Vec<GroupedMessage>) -> Vec<PageMessage> {
        let attachment_ids = distinct(grouped.iter().flat_map(|m| m.attachment_ids.iter()));
        let author_ids = distinct(grouped.iter().map(|m| &m.author_id));

        let files = if attachment_ids.is_empty() {
            HashMap::new()
        } else {
            self.attachments
                .resolve_many(&attachment_ids)
                .await
                .unwrap_or_else(|e| {
                    warn!(conversation = %conversation, error = %e, "attachment resolution failed");
                    HashMap::new()
                })
        };

        let names = if author_ids.is_empty() {
            HashMap::new()
        } else {
            self.identities
                .display_names(&author_ids)
                .await
                .unwrap_or_else(|e| {
                    warn!(conversation = %conversation, error = %e, "display name resolution failed");
                    HashMap::new()
                })
        };

        grouped
            .into_iter()
            .map(|m| {
                let attachments = m
                    .attachment_ids
                    .iter()
                    .filter_map(|id| files.get(id).cloned())
                    .collect();
                let sender_full_name = names
                    .get(&m.author_id)
                    .cloned()
                    .unwrap_or_else(|| m.author_id.clone());

                PageMessage {
                    id: m.id,
                    conversation: conversation.to_string(),
                    author_id: m.author_id,
                    sender_full_name,
                    content: m.content,
                    timestamp: m.timestamp,
                    creation: m.creation,
                    attachments,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn row(id: &str, ts: i64, attachment: Option<&str>) -> RawMessageRow {
        RawMessageRow {
            message_id: id.to_string(),
            author_id: format!("{id}-author"),
            content: Some(format!("content of {id}")),
            timestamp: ts,
            creation: ts,
            attachment_id: attachment.map(str::to_string),
        }
    }

    /// Serves rows in the order given, windowed like the SQL store.
    #[derive(Default)]
    struct FakeSource {
        rows: Vec<RawMessageRow>,
        windows: Mutex<Vec<RowWindow>>,
        fail: bool,
    }

    #[async_trait]
    impl MessageSource for FakeSource {
        async fn fetch_rows(
            &self,
            _conversation: &str,
            window: RowWindow,
        ) -> Result<Vec<RawMessageRow>, SourceError> {
            self.windows.lock().unwrap().push(window);
            if self.fail {
                return Err(SourceError::Backend("disk on fire".into()));
            }
            let offset = window.offset as usize;
            let limit = window.limit as usize;
            Ok(match window.unit {
                WindowUnit::RawRows => self.rows.iter().skip(offset).take(limit).cloned().collect(),
                WindowUnit::Messages => {
                    let ids: Vec<String> = distinct(self.rows.iter().map(|r| &r.message_id))
                        .into_iter()
                        .skip(offset)
                        .take(limit)
                        .collect();
                    self.rows
                        .iter()
                        .filter(|r| ids.contains(&r.message_id))
                        .cloned()
                        .collect()
                }
            })
        }
    }

    #[derive(Default)]
    struct FakeFiles {
        files: HashMap<String, ResolvedAttachment>,
        fail: bool,
        calls: Mutex<usize>,
    }

    impl FakeFiles {
        fn with(ids: &[&str]) -> Self {
            let files = ids
                .iter()
                .map(|id| {
                    (
                        id.to_string(),
                        ResolvedAttachment {
                            id: id.to_string(),
                            display_name: format!("{id}.pdf"),
                            url: format!("/files/{id}.pdf"),
                            is_private: false,
                        },
                    )
                })
                .collect();
            Self {
                files,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl AttachmentResolver for FakeFiles {
        async fn resolve_many(
            &self,
            ids: &[String],
        ) -> Result<HashMap<String, ResolvedAttachment>, SourceError> {
            *self.calls.lock().unwrap() += 1;
            if self.fail {
                return Err(SourceError::Backend("file table gone".into()));
            }
            Ok(ids
                .iter()
                .filter_map(|id| self.files.get(id).map(|f| (id.clone(), f.clone())))
                .collect())
        }
    }

    #[derive(Default)]
    struct FakeNames {
        names: HashMap<String, String>,
        fail: bool,
    }

    #[async_trait]
    impl IdentityResolver for FakeNames {
        async fn display_names(&self, ids: &[String]) -> Result<HashMap<String, String>, SourceError> {
            if self.fail {
                return Err(SourceError::Backend("users table gone".into()));
            }
            Ok(ids
                .iter()
                .filter_map(|id| self.names.get(id).map(|n| (id.clone(), n.clone())))
                .collect())
        }
    }

    fn paginator(source: FakeSource, files: FakeFiles, names: FakeNames) -> (Paginator, Arc<FakeSource>) {
        let source = Arc::new(source);
        let p = Paginator::new(source.clone(), Arc::new(files), Arc::new(names));
        (p, source)
    }

    fn ids(page: &Page) -> Vec<&str> {
        page.messages.iter().map(|m| m.id.as_str()).collect()
    }

    #[tokio::test]
    async fn newest_first_with_sentinel() {
        let source = FakeSource {
            rows: vec![row("m3", 300, None), row("m2", 200, None), row("m1", 100, None)],
            ..Default::default()
        };
        let (p, source) = paginator(source, FakeFiles::default(), FakeNames::default());

        let page = p.fetch_page("PROJ-1", 2, 0).await.unwrap();

        assert_eq!(ids(&page), ["m3", "m2"]);
        assert!(page.has_more);
        assert_eq!(
            source.windows.lock().unwrap()[0],
            RowWindow { offset: 0, limit: 3, unit: WindowUnit::RawRows }
        );

        let page = p.fetch_page("PROJ-1", 2, 2).await.unwrap();
        assert_eq!(ids(&page), ["m1"]);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn repeated_attachment_rows_collapse() {
        let source = FakeSource {
            rows: vec![
                row("m1", 100, Some("f1")),
                row("m1", 100, Some("f1")),
                row("m1", 100, Some("f2")),
            ],
            ..Default::default()
        };
        let (p, _) = paginator(source, FakeFiles::with(&["f1", "f2"]), FakeNames::default());

        let page = p.fetch_page("PROJ-1", 10, 0).await.unwrap();

        assert_eq!(page.messages.len(), 1);
        let attached: Vec<_> = page.messages[0].attachments.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(attached, ["f1", "f2"]);
    }

    #[tokio::test]
    async fn non_positive_limit_uses_default_and_negative_start_is_zero() {
        let (p, source) = paginator(FakeSource::default(), FakeFiles::default(), FakeNames::default());

        let page = p.fetch_page("PROJ-1", 0, -5).await.unwrap();
        assert!(page.messages.is_empty());
        assert!(!page.has_more);

        p.fetch_page("PROJ-1", -3, 0).await.unwrap();

        let windows = source.windows.lock().unwrap();
        assert_eq!(windows[0].limit, 51);
        assert_eq!(windows[0].offset, 0);
        assert_eq!(windows[1].limit, 51);
    }

    #[tokio::test]
    async fn limit_is_capped() {
        let (p, source) = paginator(FakeSource::default(), FakeFiles::default(), FakeNames::default());
        let p = p.with_page_sizes(20, 100);

        p.fetch_page("PROJ-1", 10_000, 0).await.unwrap();
        p.fetch_page("PROJ-1", 0, 0).await.unwrap();

        let windows = source.windows.lock().unwrap();
        assert_eq!(windows[0].limit, 101);
        assert_eq!(windows[1].limit, 21);
    }

    #[tokio::test]
    async fn unresolved_author_falls_back_to_id() {
        let source = FakeSource {
            rows: vec![row("m2", 200, None), row("m1", 100, None)],
            ..Default::default()
        };
        let names = FakeNames {
            names: HashMap::from([("m2-author".to_string(), "Priya Shah".to_string())]),
            ..Default::default()
        };
        let (p, _) = paginator(source, FakeFiles::default(), names);

        let page = p.fetch_page("PROJ-1", 10, 0).await.unwrap();

        assert_eq!(page.messages[0].sender_full_name, "Priya Shah");
        assert_eq!(page.messages[1].sender_full_name, "m1-author");
    }

    #[tokio::test]
    async fn raw_row_sentinel_counts_attachment_fan_out() {
        // m2 has two attachments: 3 raw rows for 2 messages
        let rows = vec![
            row("m2", 200, Some("f1")),
            row("m2", 200, Some("f2")),
            row("m1", 100, None),
        ];

        let source = FakeSource { rows: rows.clone(), ..Default::default() };
        let (p, _) = paginator(source, FakeFiles::with(&["f1", "f2"]), FakeNames::default());
        let page = p.fetch_page("PROJ-1", 2, 0).await.unwrap();
        assert_eq!(ids(&page), ["m2", "m1"]);
        assert!(page.has_more, "raw-row mode reports the sentinel row");

        let source = FakeSource { rows, ..Default::default() };
        let (p, source) = paginator(source, FakeFiles::with(&["f1", "f2"]), FakeNames::default());
        let p = p.with_unit(WindowUnit::Messages);
        let page = p.fetch_page("PROJ-1", 2, 0).await.unwrap();
        assert_eq!(ids(&page), ["m2", "m1"]);
        assert_eq!(page.messages[0].attachments.len(), 2);
        assert!(!page.has_more);
        assert_eq!(source.windows.lock().unwrap()[0].unit, WindowUnit::Messages);
    }

    #[tokio::test]
    async fn raw_row_window_can_split_a_message() {
        // The window ends inside m2's attachment rows: m2 shows only f1
        let source = FakeSource {
            rows: vec![
                row("m3", 300, None),
                row("m2", 200, Some("f1")),
                row("m2", 200, Some("f2")),
                row("m1", 100, None),
            ],
            ..Default::default()
        };
        let (p, _) = paginator(source, FakeFiles::with(&["f1", "f2"]), FakeNames::default());

        let page = p.fetch_page("PROJ-1", 1, 0).await.unwrap();
        assert_eq!(ids(&page), ["m3"]);
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn output_is_resorted_and_ties_use_creation() {
        let mut early = row("a", 100, None);
        early.creation = 1;
        let mut late = row("b", 100, None);
        late.creation = 2;
        let source = FakeSource {
            rows: vec![row("old", 50, None), early, row("new", 500, None), late],
            ..Default::default()
        };
        let (p, _) = paginator(source, FakeFiles::default(), FakeNames::default());

        let page = p.fetch_page("PROJ-1", 10, 0).await.unwrap();
        assert_eq!(ids(&page), ["new", "b", "a", "old"]);
        assert!(page.messages.iter().all(|m| m.conversation == "PROJ-1"));
    }

    #[tokio::test]
    async fn resolver_failures_degrade_gracefully() {
        let source = FakeSource {
            rows: vec![row("m1", 100, Some("f1"))],
            ..Default::default()
        };
        let files = FakeFiles { fail: true, ..Default::default() };
        let names = FakeNames { fail: true, ..Default::default() };
        let (p, _) = paginator(source, files, names);

        let page = p.fetch_page("PROJ-1", 10, 0).await.unwrap();
        assert_eq!(page.messages.len(), 1);
        assert!(page.messages[0].attachments.is_empty());
        assert_eq!(page.messages[0].sender_full_name, "m1-author");
    }

    #[tokio::test]
    async fn unknown_attachment_is_dropped_and_lookup_is_batched() {
        let source = FakeSource {
            rows: vec![
                row("m2", 200, Some("f1")),
                row("m2", 200, Some("gone")),
                row("m1", 100, Some("f1")),
            ],
            ..Default::default()
        };
        let files = Arc::new(FakeFiles::with(&["f1"]));
        let p = Paginator::new(Arc::new(source), files.clone(), Arc::new(FakeNames::default()));

        let page = p.fetch_page("PROJ-1", 10, 0).await.unwrap();
        assert_eq!(page.messages[0].attachments.len(), 1);
        assert_eq!(page.messages[0].attachments[0].id, "f1");
        assert_eq!(page.messages[1].attachments[0].id, "f1");
        assert_eq!(*files.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn no_attachment_lookup_for_plain_page() {
        let source = FakeSource {
            rows: vec![row("m1", 100, None)],
            ..Default::default()
        };
        let files = Arc::new(FakeFiles::default());
        let p = Paginator::new(Arc::new(source), files.clone(), Arc::new(FakeNames::default()));

        p.fetch_page("PROJ-1", 10, 0).await.unwrap();
        assert_eq!(*files.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_conversation_and_store_failure() {
        let (p, source) = paginator(FakeSource::default(), FakeFiles::default(), FakeNames::default());
        assert!(matches!(
            p.fetch_page("", 10, 0).await,
            Err(PageError::EmptyConversation)
        ));
        assert!(source.windows.lock().unwrap().is_empty());

        let failing = FakeSource { fail: true, ..Default::default() };
        let (p, _) = paginator(failing, FakeFiles::default(), FakeNames::default());
        assert!(matches!(
            p.fetch_page("PROJ-1", 10, 0).await,
            Err(PageError::Source(SourceError::Backend(_)))
        ));
    }

    #[tokio::test]
    async fn pages_are_deterministic() {
        let rows = vec![
            row("m3", 100, Some("f1")),
            row("m2", 100, None),
            row("m1", 100, Some("f1")),
        ];
        let source = FakeSource { rows, ..Default::default() };
        let (p, _) = paginator(source, FakeFiles::with(&["f1"]), FakeNames::default());

        let first = p.fetch_page("PROJ-1", 2, 0).await.unwrap();
        let second = p.fetch_page("PROJ-1", 2, 0).await.unwrap();
        assert_eq!(first, second);
        assert!(first.messages.len() <= 2);
    }

    /// Eight messages in store order with tied timestamps and 0-2
    /// attachments each; every fourth message repeats an attachment row.
    fn fan_out_rows() -> (Vec<RawMessageRow>, Vec<String>) {
        let mut rows = Vec::new();
        let mut files = Vec::new();
        for i in (1..=8i64).rev() {
            let id = format!("m{i}");
            let mut base = row(&id, (i / 2) * 100, None);
            base.creation = i;
            let count = i % 3;
            if count == 0 {
                rows.push(base);
                continue;
            }
            for n in 0..count {
                let file = format!("{id}-f{n}");
                files.push(file.clone());
                rows.push(RawMessageRow { attachment_id: Some(file), ..base.clone() });
            }
            if i % 4 == 0 {
                let repeat = rows[rows.len() - 1].clone();
                rows.push(repeat);
            }
        }
        (rows, files)
    }

    fn assert_page_shape(page: &Page, limit: i64, start: i64) {
        assert!(page.messages.len() <= limit as usize, "limit {limit} start {start}");
        for pair in page.messages.windows(2) {
            assert!(
                (pair[0].timestamp, pair[0].creation) >= (pair[1].timestamp, pair[1].creation),
                "limit {limit} start {start}: {} before {}",
                pair[0].id,
                pair[1].id
            );
        }
        for m in &page.messages {
            let unique: HashSet<_> = m.attachments.iter().map(|a| &a.id).collect();
            assert_eq!(unique.len(), m.attachments.len(), "duplicate attachment on {}", m.id);
        }
    }

    #[tokio::test]
    async fn every_window_is_sorted_bounded_and_flags_more() {
        let (rows, files) = fan_out_rows();
        let file_refs: Vec<&str> = files.iter().map(String::as_str).collect();
        let total_rows = rows.len();
        let total_messages = distinct(rows.iter().map(|r| &r.message_id)).len();

        let source = FakeSource { rows: rows.clone(), ..Default::default() };
        let (raw, _) = paginator(source, FakeFiles::with(&file_refs), FakeNames::default());
        let source = FakeSource { rows, ..Default::default() };
        let (grouped, _) = paginator(source, FakeFiles::with(&file_refs), FakeNames::default());
        let grouped = grouped.with_unit(WindowUnit::Messages);

        for limit in 1..=6i64 {
            for start in 0..=(total_rows as i64 + 2) {
                let page = raw.fetch_page("PROJ-1", limit, start).await.unwrap();
                assert_page_shape(&page, limit, start);
                let served = total_rows.saturating_sub(start as usize).min(limit as usize + 1);
                assert_eq!(
                    page.has_more,
                    served == limit as usize + 1,
                    "raw rows, limit {limit} start {start}"
                );

                let page = grouped.fetch_page("PROJ-1", limit, start).await.unwrap();
                assert_page_shape(&page, limit, start);
                let remaining = total_messages.saturating_sub(start as usize);
                assert_eq!(page.messages.len(), remaining.min(limit as usize));
                assert_eq!(
                    page.has_more,
                    remaining > limit as usize,
                    "messages, limit {limit} start {start}"
                );
            }
        }
    }

    #[test]
    fn group_rows_keeps_first_seen_parent_fields() {
        let mut dup = row("m1", 100, Some("f2"));
        dup.content = Some("ignored".into());
        let grouped = group_rows(vec![row("m1", 100, Some("f1")), dup, row("m0", 90, None)]);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].content.as_deref(), Some("content of m1"));
        assert_eq!(grouped[0].attachment_ids, ["f1", "f2"]);
        assert!(grouped[1].attachment_ids.is_empty());
    }
}
