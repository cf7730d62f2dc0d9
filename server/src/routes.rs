use axum::routing::{get, post};
use maud::html;

use crate::components::layout::{Card, Page};
use crate::state::AppState;

pub mod feed;
pub mod oauth;

/// Build the application router with all routes
pub fn routes(app_state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/", get(home_page))
        .route("/generate", post(oauth::generate))
        .route("/oauth_callback", get(oauth::callback))
        .route("/atom", get(feed::atom))
        .route("/html", get(feed::html))
        // Add trace layer for debugging
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Home page: the feed-generation form.
async fn home_page() -> Page {
    let content = html! {
        h1 class="text-2xl font-semibold text-sky-800" { "twitter-atom" }
        p class="text-gray-600 mt-2 mb-6" {
            "Get your Twitter news feed, or any list, as a private Atom feed. "
            "Create a Twitter app of your own, paste its key and secret below, "
            "and authorize it against your account."
        }

        form action="/generate" method="post" class="space-y-4" {
            div {
                label for="consumer_key" class="block text-sm font-medium text-gray-700" {
                    "App (consumer) key"
                }
                input type="text" id="consumer_key" name="consumer_key" required
                    class="mt-1 w-full border rounded-md px-3 py-2 text-sm";
            }

            div {
                label for="consumer_secret" class="block text-sm font-medium text-gray-700" {
                    "App (consumer) secret"
                }
                input type="text" id="consumer_secret" name="consumer_secret" required
                    class="mt-1 w-full border rounded-md px-3 py-2 text-sm";
            }

            div {
                label for="list" class="block text-sm font-medium text-gray-700" {
                    "List (optional, " code { "owner/slug" } ")"
                }
                input type="text" id="list" name="list" placeholder="e.g. snarfed/birds"
                    class="mt-1 w-full border rounded-md px-3 py-2 text-sm";
                p class="text-xs text-gray-500 mt-1" {
                    "Leave empty for your home timeline."
                }
            }

            button type="submit"
                class="bg-sky-600 hover:bg-sky-700 text-white px-4 py-2 rounded-md text-sm" {
                "Authorize with Twitter"
            }
        }
    };

    Page::new("twitter-atom".to_string(), Box::new(Card::new(content)))
}
