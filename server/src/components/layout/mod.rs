use maud::{html, Markup, Render};

pub struct Page {
    pub title: String,
    pub content: Box<dyn Render>,
}

impl Page {
    pub fn new(title: String, content: Box<dyn Render>) -> Self {
        Self { title, content }
    }
}

impl Render for Page {
    fn render(&self) -> Markup {
        html! {
            (maud::DOCTYPE)
            html lang="en" {
                head {
                    title { (self.title) }
                    script src="https://unpkg.com/@tailwindcss/browser@4" {}
                    meta charset="utf-8";
                    meta name="viewport" content="width=device-width, initial-scale=1.0";
                }

                body class="min-h-screen bg-gradient-to-br from-sky-100 via-white to-blue-50 py-8 px-4" {
                    (self.content.render())

                    // Footer credit
                    div class="mt-8 text-center text-sm text-gray-500" {
                        p { "twitter-atom turns your Twitter timeline into a private Atom feed." }
                    }
                }
            }
        }
    }
}

impl axum::response::IntoResponse for Page {
    fn into_response(self) -> axum::response::Response {
        self.render().into_response()
    }
}

pub struct Card {
    pub content: Box<dyn Render>,
}

impl Card {
    pub fn new(content: impl Render + 'static) -> Self {
        Self {
            content: Box::new(content),
        }
    }
}

impl Render for Card {
    fn render(&self) -> Markup {
        html! {
            div class="max-w-xl mx-auto bg-white rounded-xl border border-gray-100 shadow-lg overflow-hidden w-full p-6" {
                (self.content.render())
            }
        }
    }
}
