//! Tolerant feed markup parsing.
//!
//! Extracts `<item>` elements from the RSS document in document order.
//! Extraction is attempted in full per item; an item missing a required
//! field is skipped and counted, never failing the whole parse. Only a
//! document with no markup at all is [`NewsError::MalformedFeed`] — a
//! well-formed feed with zero items is a valid "no current headlines"
//! outcome.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::{FeedItem, NewsError};

/// The item child elements the parser extracts text from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemField {
    Title,
    PubDate,
    Link,
    Source,
}

impl ItemField {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Self::Title),
            b"pubDate" => Some(Self::PubDate),
            b"link" => Some(Self::Link),
            b"source" => Some(Self::Source),
            _ => None,
        }
    }
}

/// Accumulates one `<item>`'s fields until its end tag decides whether the
/// item is usable.
#[derive(Debug, Default)]
struct PartialItem {
    title: Option<String>,
    published_at: Option<String>,
    url: Option<String>,
    source_name: Option<String>,
    source_url: Option<String>,
}

impl PartialItem {
    fn push_text(&mut self, field: ItemField, text: &str) {
        let slot = match field {
            ItemField::Title => &mut self.title,
            ItemField::PubDate => &mut self.published_at,
            ItemField::Link => &mut self.url,
            ItemField::Source => &mut self.source_name,
        };
        match slot {
            Some(existing) => existing.push_str(text),
            None => *slot = Some(text.to_owned()),
        }
    }

    fn finish(self) -> Result<FeedItem, &'static str> {
        Ok(FeedItem {
            title: self.title.ok_or("title")?,
            published_at: self.published_at.ok_or("pubDate")?,
            url: self.url.ok_or("link")?,
            source_name: self.source_name.ok_or("source")?,
            source_url: self.source_url.ok_or("source url attribute")?,
        })
    }
}

/// Parses raw feed bytes into at most `max_items` normalized items,
/// preserving document order.
///
/// Some feed variants lead with a self-referential "search" entry rather
/// than a genuine article; the parser deliberately keeps it, since the
/// behavior is inconsistent across the provider's editions. Callers
/// working against such a variant drop index 0 themselves.
///
/// # Errors
///
/// Returns [`NewsError::MalformedFeed`] when the bytes are not valid
/// UTF-8, the XML reader fails, or the document contains no elements at
/// all. Missing fields on individual items are not errors; those items
/// are skipped and logged.
pub fn parse_feed(raw: &[u8], max_items: usize) -> Result<Vec<FeedItem>, NewsError> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| NewsError::MalformedFeed(format!("invalid UTF-8: {e}")))?;

    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut skipped: u32 = 0;
    let mut saw_element = false;
    let mut current: Option<PartialItem> = None;
    let mut field: Option<ItemField> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                saw_element = true;
                let name = e.local_name();
                if name.as_ref() == b"item" {
                    current = Some(PartialItem::default());
                    field = None;
                } else if let Some(item) = current.as_mut() {
                    field = ItemField::from_name(name.as_ref());
                    if field == Some(ItemField::Source) {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"url"
                                && let Ok(value) = attr.unescape_value()
                            {
                                item.source_url = Some(value.into_owned());
                            }
                        }
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                saw_element = true;
                // A self-closing child carries attributes but no text.
                if let Some(item) = current.as_mut()
                    && e.local_name().as_ref() == b"source"
                {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"url"
                            && let Ok(value) = attr.unescape_value()
                        {
                            item.source_url = Some(value.into_owned());
                        }
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let (Some(item), Some(f)) = (current.as_mut(), field) {
                    let text = e
                        .unescape()
                        .map_err(|err| NewsError::MalformedFeed(err.to_string()))?;
                    item.push_text(f, &text);
                }
            }
            Ok(Event::CData(e)) => {
                if let (Some(item), Some(f)) = (current.as_mut(), field) {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    item.push_text(f, &text);
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"item" {
                    if let Some(item) = current.take() {
                        match item.finish() {
                            Ok(item) => items.push(item),
                            Err(missing) => {
                                skipped += 1;
                                log::warn!("skipping feed item missing {missing}");
                            }
                        }
                    }
                }
                field = None;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(NewsError::MalformedFeed(e.to_string())),
        }
    }

    if !saw_element {
        return Err(NewsError::MalformedFeed(
            "document contains no elements".to_owned(),
        ));
    }

    if skipped > 0 {
        log::warn!("skipped {skipped} feed items with missing fields");
    }

    items.truncate(max_items);
    log::debug!("parsed {} feed items", items.len());

    Ok(items)
}
