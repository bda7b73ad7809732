use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use quaderno_notion_types::SlugEntry;
use thiserror::Error;

use crate::{
    application::{
        error::{ErrorReport, HttpError},
        reviews::{Review, ReviewSummary},
    },
    domain::entities::BookEntry,
};

const SITE_TITLE: &str = "quaderno";

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response() -> Response {
    let mut response = render_template_response(
        NotFoundTemplate {
            site_title: SITE_TITLE,
        },
        StatusCode::NOT_FOUND,
    );
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Listing rows as served to the index page.
#[derive(Clone)]
pub struct PostLinkView {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub date: String,
}

impl From<SlugEntry> for PostLinkView {
    fn from(entry: SlugEntry) -> Self {
        // Upstream timestamps look like `2024-03-01T00:00:00.000Z`; only the day is shown.
        let date = entry
            .created_time
            .split('T')
            .next()
            .unwrap_or_default()
            .to_string();
        Self {
            id: entry.id,
            slug: entry.slug,
            title: entry.title,
            date,
        }
    }
}

/// `GET /notion/allposts/{filter}`: list fragment swapped into the index page.
#[derive(Template)]
#[template(path = "partials/post_list.html")]
pub struct PostListTemplate {
    pub filter: String,
    pub posts: Vec<PostLinkView>,
}

impl PostListTemplate {
    pub fn new(filter: impl Into<String>, entries: Vec<SlugEntry>) -> Self {
        Self {
            filter: filter.into(),
            posts: entries.into_iter().map(PostLinkView::from).collect(),
        }
    }
}

/// `GET /notion/content/{id}`: rendered post body without chrome.
#[derive(Template)]
#[template(path = "partials/post_content.html")]
pub struct PostContentTemplate {
    pub id: String,
    pub body: String,
}

/// `GET /notion/posts/{id}`: rendered post inside the site layout.
#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub site_title: &'static str,
    pub id: String,
    pub body: String,
}

impl PostTemplate {
    pub fn new(id: impl Into<String>, body: String) -> Self {
        Self {
            site_title: SITE_TITLE,
            id: id.into(),
            body,
        }
    }
}

#[derive(Template)]
#[template(path = "reading_now.html")]
pub struct ReadingNowTemplate {
    pub site_title: &'static str,
    pub books: Vec<BookEntry>,
}

impl ReadingNowTemplate {
    pub fn new(books: Vec<BookEntry>) -> Self {
        Self {
            site_title: SITE_TITLE,
            books,
        }
    }
}

pub struct ReviewLinkView {
    pub slug: String,
    pub title: String,
    pub published: String,
}

impl From<ReviewSummary> for ReviewLinkView {
    fn from(summary: ReviewSummary) -> Self {
        let published = summary.published_label();
        Self {
            slug: summary.slug,
            title: summary.title,
            published,
        }
    }
}

/// `GET /reviews`
#[derive(Template)]
#[template(path = "reviews.html")]
pub struct ReviewListTemplate {
    pub site_title: &'static str,
    pub reviews: Vec<ReviewLinkView>,
}

impl ReviewListTemplate {
    pub fn new(summaries: Vec<ReviewSummary>) -> Self {
        Self {
            site_title: SITE_TITLE,
            reviews: summaries.into_iter().map(ReviewLinkView::from).collect(),
        }
    }
}

/// `GET /reviews/{slug}`: the markdown body is trusted local content.
#[derive(Template)]
#[template(path = "review.html")]
pub struct ReviewTemplate {
    pub site_title: &'static str,
    pub title: String,
    pub published: String,
    pub body: String,
}

impl From<Review> for ReviewTemplate {
    fn from(review: Review) -> Self {
        Self {
            site_title: SITE_TITLE,
            published: review.summary.published_label(),
            title: review.summary.title,
            body: review.html,
        }
    }
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub site_title: &'static str,
}
