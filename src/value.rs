//! Conversions from site data into template [`Value`]s. Keys are camelCase
//! to match `config.json`.
//!
//! Maps (front matter `meta`, unrecognized configuration keys) become
//! template objects, which `range` visits in no particular order. Each map is
//! therefore also exposed as a list of `{key, value}` objects sorted by key
//! (`.content.metaEntries`, `.siteConfig.extraEntries`); layouts that iterate
//! should use those.

use crate::file::{Document, Listing, PostSummary};
use crate::processor::SiteInfo;
use crate::tag::Tag;
use chrono::NaiveDate;
use gtmpl::Value;
use std::collections::HashMap;

const DATE_FORMAT: &str = "%Y-%m-%d";

impl From<&Tag> for Value {
    /// Converts [`Tag`]s into [`Value`]s for templating.
    fn from(t: &Tag) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("name".to_owned(), Value::String(t.name.clone()));
        m.insert("url".to_owned(), Value::String(t.url.clone()));
        Value::Object(m)
    }
}

impl From<&PostSummary> for Value {
    fn from(p: &PostSummary) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), Value::String(p.title.clone()));
        m.insert("url".to_owned(), Value::String(p.url.clone()));
        m.insert("date".to_owned(), date(Some(p.date)));
        m.insert("summary".to_owned(), Value::String(p.summary.clone()));
        m.insert("summarized".to_owned(), Value::Bool(p.summarized));
        m.insert("tags".to_owned(), tags(&p.tags));
        Value::Object(m)
    }
}

impl From<&SiteInfo> for Value {
    /// Converts the [`SiteInfo`] into the `siteConfig` value. Unrecognized
    /// configuration keys are merged in at the top level.
    fn from(site: &SiteInfo) -> Value {
        let mut m: HashMap<String, Value> = site
            .extra
            .iter()
            .map(|(k, v)| (k.clone(), json(v)))
            .collect();
        m.insert("extraEntries".to_owned(), entries(&site.extra));
        m.insert("title".to_owned(), Value::String(site.title.clone()));
        m.insert("siteTitle".to_owned(), Value::String(site.title.clone()));
        m.insert("tags".to_owned(), tags(&site.tags));
        m.insert(
            "feedUrl".to_owned(),
            Value::String(site.feed_url.clone().unwrap_or_default()),
        );
        Value::Object(m)
    }
}

impl From<&Document> for Value {
    /// Converts a [`Document`] into the `content` value. Every key is always
    /// present so layouts never trip over a missing field.
    fn from(doc: &Document) -> Value {
        let empty = Listing::default();
        let listing = doc.listing.as_ref().unwrap_or(&empty);

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert(
            "source".to_owned(),
            Value::String(doc.source.to_string_lossy().into_owned()),
        );
        m.insert("layout".to_owned(), Value::String(doc.layout.clone()));
        m.insert("title".to_owned(), Value::String(doc.title.clone()));
        m.insert("date".to_owned(), date(doc.date));
        m.insert("draft".to_owned(), Value::Bool(doc.draft));
        m.insert("tags".to_owned(), tags(&doc.tags));
        m.insert(
            "meta".to_owned(),
            Value::Object(doc.meta.iter().map(|(k, v)| (k.clone(), json(v))).collect()),
        );
        m.insert("metaEntries".to_owned(), entries(&doc.meta));
        m.insert("body".to_owned(), Value::String(doc.body.clone()));
        m.insert("html".to_owned(), Value::String(doc.html.clone()));
        m.insert("summary".to_owned(), Value::String(doc.summary.clone()));
        m.insert(
            "outputPath".to_owned(),
            Value::String(doc.output_path.to_string_lossy().into_owned()),
        );
        m.insert("url".to_owned(), Value::String(doc.url.clone()));
        m.insert(
            "tag".to_owned(),
            listing.tag.as_ref().map(Value::from).unwrap_or(Value::Nil),
        );
        m.insert(
            "posts".to_owned(),
            Value::Array(listing.posts.iter().map(Value::from).collect()),
        );
        Value::Object(m)
    }
}

// `map` as a list of `{key, value}` objects, sorted by key.
fn entries(map: &serde_json::Map<String, serde_json::Value>) -> Value {
    let mut pairs: Vec<(&String, &serde_json::Value)> = map.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    Value::Array(
        pairs
            .into_iter()
            .map(|(k, v)| {
                let mut m: HashMap<String, Value> = HashMap::new();
                m.insert("key".to_owned(), Value::String(k.clone()));
                m.insert("value".to_owned(), json(v));
                Value::Object(m)
            })
            .collect(),
    )
}

fn tags(tags: &[Tag]) -> Value {
    Value::Array(tags.iter().map(Value::from).collect())
}

fn date(date: Option<NaiveDate>) -> Value {
    Value::String(
        date.map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default(),
    )
}

/// Converts a JSON value (front matter or configuration) into a [`Value`].
pub fn json(v: &serde_json::Value) -> Value {
    use serde_json::Value as Json;
    match v {
        Json::Null => Value::Nil,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => Value::from(i),
            (_, Some(u), _) => Value::from(u),
            (_, _, Some(f)) => Value::from(f),
            _ => Value::String(n.to_string()),
        },
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => Value::Array(items.iter().map(json).collect()),
        Json::Object(map) => {
            Value::Object(map.iter().map(|(k, v)| (k.clone(), json(v))).collect())
        }
    }
}
