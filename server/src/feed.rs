//! Feed rendering: one normalized activity set, two output formats.

use atom_syndication::{
    Content, ContentBuilder, Entry, EntryBuilder, FeedBuilder, GeneratorBuilder, Link,
    LinkBuilder, Person, PersonBuilder, Text,
};
use chrono::{DateTime, TimeZone, Utc};
use maud::{html, PreEscaped};

use crate::activity::{Activity, Actor};

pub const SERVICE_NAME: &str = "twitter-atom";

/// Feed-reader-visible identifiers are scoped to the service's founding
/// year so they stay stable for its lifetime, whatever the clock says.
const TAG_URI_YEAR: i32 = 2013;
const TAG_URI_DOMAIN: &str = "twitter.com";

/// Base for resolving relative links inside post content.
const XML_BASE: &str = "https://twitter.com/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Atom,
    Html,
}

impl FeedFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            FeedFormat::Atom => "application/atom+xml",
            FeedFormat::Html => "text/html; charset=utf-8",
        }
    }
}

pub fn tag_uri(specific: &str) -> String {
    format!("tag:{TAG_URI_DOMAIN},{TAG_URI_YEAR}:{specific}")
}

/// Timestamp used wherever a fixed, non-wall-clock time is needed (empty
/// feeds, the legacy placeholder, the re-auth prompt).
fn fixed_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2013, 7, 8, 20, 0, 0).unwrap()
}

/// Render the activity set as an Atom 1.0 document.
pub fn render_atom(
    activities: &[Activity],
    actor: Option<&Actor>,
    title: &str,
    base_url: &str,
    request_url: &str,
) -> String {
    let updated = activities
        .first()
        .map(|a| a.published)
        .unwrap_or_else(fixed_timestamp);

    let mut links = vec![LinkBuilder::default()
        .href(request_url.to_string())
        .rel("self".to_string())
        .mime_type(Some("application/atom+xml".to_string()))
        .build()];
    if let Some(actor) = actor {
        links.push(alternate_link(&actor.url));
    }

    let feed = FeedBuilder::default()
        .title(Text::plain(title.to_string()))
        .id(feed_id(actor))
        .base(Some(XML_BASE.to_string()))
        .lang(Some("en-US".to_string()))
        .generator(Some(
            GeneratorBuilder::default()
                .value(SERVICE_NAME.to_string())
                .uri(Some(base_url.to_string()))
                .build(),
        ))
        .updated(updated.fixed_offset())
        .links(links)
        .authors(actor.map(person_for).into_iter().collect::<Vec<_>>())
        .entries(activities.iter().map(entry_for).collect::<Vec<_>>())
        .build();

    feed.to_string()
}

fn feed_id(actor: Option<&Actor>) -> String {
    tag_uri(actor.map_or("feed", |a| a.username.as_str()))
}

fn entry_for(activity: &Activity) -> Entry {
    EntryBuilder::default()
        .title(Text::plain(entry_title(&activity.content)))
        .id(tag_uri(&activity.id))
        .published(Some(activity.published.fixed_offset()))
        .updated(activity.published.fixed_offset())
        .authors(vec![person_for(&activity.actor)])
        .links(vec![alternate_link(&activity.url)])
        .content(Some(html_content(&activity.content)))
        .build()
}

fn alternate_link(href: &str) -> Link {
    LinkBuilder::default()
        .href(href.to_string())
        .rel("alternate".to_string())
        .mime_type(Some("text/html".to_string()))
        .build()
}

fn person_for(actor: &Actor) -> Person {
    PersonBuilder::default()
        .name(actor.name().to_string())
        .uri(Some(actor.url.clone()))
        .build()
}

fn html_content(content: &str) -> Content {
    ContentBuilder::default()
        .content_type(Some("html".to_string()))
        .value(Some(content.to_string()))
        .build()
}

/// Entry titles are the first line of the post, tags stripped, truncated.
fn entry_title(content: &str) -> String {
    const LIMIT: usize = 100;
    let plain = strip_tags(content);
    let line = plain.lines().next().unwrap_or("").trim();
    let mut title: String = line.chars().take(LIMIT).collect();
    if line.chars().count() > LIMIT {
        title.push('…');
    }
    title
}

/// Drop tags and undo the content's entity escaping; the Atom library
/// re-escapes plain-text titles itself.
fn strip_tags(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut in_tag = false;
    for c in content.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// Render the activity set as a microformats h-feed fragment.
pub fn render_html(activities: &[Activity]) -> String {
    html! {
        div class="h-feed" {
            @for activity in activities {
                article class="h-entry" {
                    div class="p-author h-card" {
                        a class="u-url" href=(activity.actor.url) { (activity.actor.name()) }
                    }
                    div class="e-content" { (PreEscaped(activity.content.as_str())) }
                    a class="u-url" href=(activity.url) {
                        time class="dt-published" datetime=(activity.published.to_rfc3339()) {
                            (activity.published.format("%Y-%m-%d %H:%M"))
                        }
                    }
                }
            }
        }
    }
    .into_string()
}

/// Substituted for the timeline when Twitter rejects the stored credentials,
/// so feed readers surface a fix-it link instead of a hard fetch failure.
pub fn reauth_activity(base_url: &str) -> Activity {
    let home = format!("{base_url}/");
    Activity {
        id: "reauth".to_string(),
        url: home.clone(),
        content: format!(
            "Your Twitter login has expired or been revoked. \
             <a href=\"{home}\">Click here to regenerate your feed.</a>"
        ),
        published: fixed_timestamp(),
        actor: Actor {
            id: SERVICE_NAME.to_string(),
            username: SERVICE_NAME.to_string(),
            display_name: Some(SERVICE_NAME.to_string()),
            url: home,
            avatar_url: None,
            description: None,
        },
    }
}

/// Feeds generated before consumer credentials were user-supplied carry no
/// consumer key at all. They get a fixed pointer at the new URL format
/// instead of an upstream call that can no longer succeed.
pub fn welcome_back_feed(base_url: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xml:lang="en-US" xmlns="http://www.w3.org/2005/Atom">
<generator uri="{base_url}">{SERVICE_NAME}</generator>
<id>{feed_id}</id>
<title>Twitter Atom feeds have moved!</title>
<updated>2013-07-08T20:00:00Z</updated>
<entry>
<id>{entry_id}</id>
<title>Twitter Atom feeds have moved!</title>
<content type="xhtml">
<div xmlns="http://www.w3.org/1999/xhtml">
<p><b>This feed URL uses a retired format. <a href="{base_url}/">Generate a new feed here</a> to keep receiving your timeline. Welcome back!</b></p>
</div>
</content>
<published>2013-07-08T20:00:00Z</published>
</entry>
</feed>
"#,
        base_url = base_url,
        feed_id = tag_uri("1"),
        entry_id = tag_uri("2"),
    )
}
