//! Normalized actor/post representations, decoupled from the Twitter wire
//! format so the renderers never touch raw API JSON.

use chrono::{DateTime, Utc};

use crate::twitter::{Entities, Tweet, TwitterUser};

/// Twitter's `created_at` format, e.g. `Mon Jul 08 20:00:00 +0000 2013`.
const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

#[derive(Debug, Clone)]
pub struct Actor {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub url: String,
    pub avatar_url: Option<String>,
    pub description: Option<String>,
}

impl Actor {
    pub fn from_user(user: &TwitterUser) -> Self {
        Self {
            id: user.id_str.clone(),
            username: user.screen_name.clone(),
            display_name: user.name.clone(),
            url: format!("https://twitter.com/{}", user.screen_name),
            avatar_url: user.profile_image_url_https.clone(),
            description: user.description.clone(),
        }
    }

    /// Human-facing name: display name, else username, else a generic "you".
    pub fn name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ if !self.username.is_empty() => &self.username,
            _ => "you",
        }
    }
}

/// One normalized post, ready to render in either output format.
#[derive(Debug, Clone)]
pub struct Activity {
    pub id: String,
    pub url: String,
    /// HTML content: escaped text with t.co wrappers expanded to anchors.
    pub content: String,
    pub published: DateTime<Utc>,
    pub actor: Actor,
}

impl Activity {
    pub fn from_tweet(tweet: &Tweet) -> Self {
        let actor = Actor::from_user(&tweet.user);
        Self {
            id: tweet.id_str.clone(),
            url: format!("{}/status/{}", actor.url, tweet.id_str),
            content: render_content(tweet),
            published: parse_created_at(&tweet.created_at),
            actor,
        }
    }
}

fn parse_created_at(created_at: &str) -> DateTime<Utc> {
    DateTime::parse_from_str(created_at, CREATED_AT_FORMAT)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Tweet text as HTML. Native retweets are expanded back to the classic
/// `RT @user:` form around the original (untruncated) text.
fn render_content(tweet: &Tweet) -> String {
    if let Some(rt) = &tweet.retweeted_status {
        return format!(
            "RT <a href=\"https://twitter.com/{screen_name}\">@{screen_name}</a>: {content}",
            screen_name = escape_html(&rt.user.screen_name),
            content = text_as_html(rt),
        );
    }
    text_as_html(tweet)
}

fn text_as_html(tweet: &Tweet) -> String {
    let text = tweet
        .full_text
        .as_deref()
        .or(tweet.text.as_deref())
        .unwrap_or_default();
    linkify(text, tweet.entities.as_ref())
}

/// Escape the text, then swap each t.co wrapper for an anchor pointing at
/// its expanded target. t.co URLs contain no HTML metacharacters, so the
/// replacement can run on the escaped string.
fn linkify(text: &str, entities: Option<&Entities>) -> String {
    let mut html = escape_html(text);
    if let Some(entities) = entities {
        for url in &entities.urls {
            let target = url.expanded_url.as_deref().unwrap_or(&url.url);
            let label = url.display_url.as_deref().unwrap_or(target);
            let anchor = format!(
                "<a href=\"{}\">{}</a>",
                escape_html(target),
                escape_html(label)
            );
            html = html.replace(&url.url, &anchor);
        }
    }
    html
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twitter::UrlEntity;
    use chrono::TimeZone;

    fn user(screen_name: &str, name: Option<&str>) -> TwitterUser {
        TwitterUser {
            id_str: "1".to_string(),
            screen_name: screen_name.to_string(),
            name: name.map(str::to_string),
            description: None,
            profile_image_url_https: None,
        }
    }

    fn tweet(id: &str, text: &str) -> Tweet {
        Tweet {
            id_str: id.to_string(),
            created_at: "Mon Jul 08 20:00:00 +0000 2013".to_string(),
            text: Some(text.to_string()),
            full_text: None,
            user: user("snarfed", Some("Ryan")),
            retweeted_status: None,
            entities: None,
        }
    }

    #[test]
    fn created_at_parses_to_utc() {
        let activity = Activity::from_tweet(&tweet("501", "hi"));
        assert_eq!(
            activity.published,
            Utc.with_ymd_and_hms(2013, 7, 8, 20, 0, 0).unwrap()
        );
    }

    #[test]
    fn unparseable_dates_fall_back_to_the_epoch() {
        let mut t = tweet("501", "hi");
        t.created_at = "not a date".to_string();
        assert_eq!(
            Activity::from_tweet(&t).published,
            DateTime::<Utc>::UNIX_EPOCH
        );
    }

    #[test]
    fn permalink_is_derived_from_author_and_id() {
        let activity = Activity::from_tweet(&tweet("501", "hi"));
        assert_eq!(activity.url, "https://twitter.com/snarfed/status/501");
    }

    #[test]
    fn content_is_escaped() {
        let activity = Activity::from_tweet(&tweet("501", "a <b> & \"c\""));
        assert_eq!(activity.content, "a &lt;b&gt; &amp; &quot;c&quot;");
    }

    #[test]
    fn tco_wrappers_become_anchors() {
        let mut t = tweet("501", "look https://t.co/abc now");
        t.entities = Some(Entities {
            urls: vec![UrlEntity {
                url: "https://t.co/abc".to_string(),
                expanded_url: Some("https://example.com/page".to_string()),
                display_url: Some("example.com/page".to_string()),
            }],
        });
        assert_eq!(
            Activity::from_tweet(&t).content,
            "look <a href=\"https://example.com/page\">example.com/page</a> now"
        );
    }

    #[test]
    fn retweets_expand_to_the_classic_form() {
        let mut t = tweet("501", "RT @other: truncated…");
        t.retweeted_status = Some(Box::new(Tweet {
            user: user("other", None),
            ..tweet("400", "the full original text")
        }));
        assert_eq!(
            Activity::from_tweet(&t).content,
            "RT <a href=\"https://twitter.com/other\">@other</a>: the full original text"
        );
    }

    #[test]
    fn actor_name_falls_back_to_username() {
        let actor = Actor::from_user(&user("snarfed", None));
        assert_eq!(actor.name(), "snarfed");
        let actor = Actor::from_user(&user("snarfed", Some("Ryan")));
        assert_eq!(actor.name(), "Ryan");
    }
}
