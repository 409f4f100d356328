//! Support for creating Atom feeds from a list of posts.

use crate::config::{Author, FeedSettings};
use crate::file::Document;
use atom_syndication::{Category, Content, Entry, Error as AtomError, Feed, Link, Person, Text};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use std::fmt;
use std::io::Write;
use url::Url;

/// Bundled configuration for creating a feed.
pub struct FeedConfig<'a> {
    pub settings: &'a FeedSettings,

    /// The title used when the settings don't have one.
    pub site_title: &'a str,
}

/// Creates a feed from a [`FeedConfig`] and the `posts` (in feed order) and
/// writes the result to a [`std::io::Write`].
pub fn write_feed<'a, W, I>(config: &FeedConfig, posts: I, w: W) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a Document>,
{
    feed(config, posts)?.write_to(w)?.flush()?;
    Ok(())
}

/// Builds the feed. The feed's `updated` time is taken from the newest post
/// rather than the clock, so unchanged content yields an identical feed.
pub fn feed<'a, I>(config: &FeedConfig, posts: I) -> Result<Feed>
where
    I: IntoIterator<Item = &'a Document>,
{
    let settings = config.settings;
    let entries = posts
        .into_iter()
        .map(|post| entry(settings, post))
        .collect::<Result<Vec<Entry>>>()?;
    let updated = entries
        .iter()
        .map(|e| e.updated)
        .max()
        .unwrap_or_else(|| midnight(NaiveDate::default()));

    Ok(Feed {
        title: Text::plain(
            settings
                .title
                .clone()
                .unwrap_or_else(|| config.site_title.to_owned()),
        ),
        id: settings.link.to_string(),
        updated,
        authors: people(settings.author.as_ref()),
        subtitle: settings.description.clone().map(Text::plain),
        links: vec![link(settings.link.to_string())],
        entries,
        ..Feed::default()
    })
}

fn entry(settings: &FeedSettings, post: &Document) -> Result<Entry> {
    let url = absolute(&settings.link, &post.url)?;
    let date = midnight(post.date.unwrap_or_default());

    Ok(Entry {
        id: url.clone(),
        title: Text::plain(post.title.clone()),
        updated: date,
        published: Some(date),
        authors: people(settings.author.as_ref()),
        links: vec![link(url)],
        summary: Some(Text::html(post.summary.clone())),
        content: Some(Content {
            value: Some(post.html.clone()),
            content_type: Some("html".to_owned()),
            ..Content::default()
        }),
        categories: post
            .tags
            .iter()
            .map(|tag| Category {
                term: tag.name.clone(),
                ..Category::default()
            })
            .collect(),
        ..Entry::default()
    })
}

// Joins a site-absolute `path` (e.g. `/posts/hello/`) onto the site's base
// URL, keeping any path prefix the base URL has.
fn absolute(base: &Url, path: &str) -> Result<String> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    Ok(base.join(path.trim_start_matches('/'))?.to_string())
}

fn link(href: String) -> Link {
    Link {
        href,
        rel: "alternate".to_owned(),
        ..Link::default()
    }
}

fn midnight(date: NaiveDate) -> DateTime<FixedOffset> {
    Utc.fix().from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

fn people(author: Option<&Author>) -> Vec<Person> {
    match author {
        Some(author) => vec![Person {
            name: author.name.clone(),
            email: author.email.clone(),
            ..Person::default()
        }],
        None => Vec::new(),
    }
}

/// The result of a fallible feed operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is a generic I/O error.
    Io(std::io::Error),

    /// Returned when there is an Atom-related error.
    Atom(AtomError),

    /// Returned when a post URL can't be joined onto the feed link.
    Url(url::ParseError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Atom(err) => err.fmt(f),
            Error::Url(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Atom(err) => Some(err),
            Error::Url(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator in fallible feed operations.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<AtomError> for Error {
    /// Converts [`AtomError`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: AtomError) -> Error {
        Error::Atom(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::Url(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tag::Tag;
    use std::path::PathBuf;

    fn settings(link: &str) -> FeedSettings {
        FeedSettings {
            title: None,
            link: Url::parse(link).unwrap(),
            description: Some("Notes".to_owned()),
            author: Some(Author {
                name: "Ada".to_owned(),
                email: None,
            }),
            path: PathBuf::from("feed.xml"),
        }
    }

    fn post(title: &str, url: &str, date: (i32, u32, u32)) -> Document {
        Document {
            title: title.to_owned(),
            url: url.to_owned(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
            html: "<p>Body</p>".to_owned(),
            summary: "<p>Body</p>".to_owned(),
            tags: vec![Tag::new("rust")],
            ..Document::default()
        }
    }

    #[test]
    fn test_feed() -> Result<()> {
        let settings = settings("https://example.org/blog");
        let posts = vec![
            post("Newer", "/posts/newer/", (2021, 3, 1)),
            post("Older", "/posts/older/", (2021, 1, 1)),
        ];
        let config = FeedConfig {
            settings: &settings,
            site_title: "Example",
        };
        let feed = feed(&config, &posts)?;

        assert_eq!("Example", feed.title.value);
        assert_eq!("Ada", feed.authors[0].name);
        assert_eq!(None, feed.authors[0].email);
        assert_eq!(2, feed.entries.len());
        assert_eq!(
            "https://example.org/blog/posts/newer/",
            feed.entries[0].id
        );
        assert_eq!(feed.entries[0].updated, feed.updated);
        assert_eq!("rust", feed.entries[1].categories[0].term);
        Ok(())
    }

    #[test]
    fn test_feed_is_deterministic() -> Result<()> {
        let settings = settings("https://example.org/");
        let posts = vec![post("Only", "/posts/only/", (2020, 5, 4))];
        let config = FeedConfig {
            settings: &settings,
            site_title: "Example",
        };
        let mut first = Vec::new();
        let mut second = Vec::new();
        write_feed(&config, &posts, &mut first)?;
        write_feed(&config, &posts, &mut second)?;
        assert_eq!(first, second);
        assert!(String::from_utf8(first)
            .unwrap()
            .contains("https://example.org/posts/only/"));
        Ok(())
    }
}
