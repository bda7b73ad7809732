use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::{
    application::{error::AppError, reviews::ReviewLibrary, site::SiteService},
    infra::assets::{AssetDirectory, serve_image},
    presentation::views::{
        PostContentTemplate, PostListTemplate, PostTemplate, ReadingNowTemplate,
        ReviewListTemplate, ReviewTemplate, render_not_found_response, render_template_response,
    },
};

use super::middleware::{ContentServed, trace_requests};

#[derive(Clone)]
pub struct HttpState {
    pub site: SiteService,
    pub reviews: ReviewLibrary,
    /// Relocated images are served by the process only in development.
    pub assets: Option<AssetDirectory>,
}

pub fn build_router(state: HttpState) -> Router {
    let assets = state.assets.clone();

    let public = Router::new()
        .route("/", get(reading_now))
        .route("/readingNow", get(reading_now))
        .route("/notion/allposts/{filter}", get(all_posts))
        .route("/notion/content/{id}", get(post_content))
        .route("/notion/posts/{id}", get(post_page))
        .route("/reviews", get(reviews))
        .route("/reviews/{slug}", get(review))
        .route("/_health", get(health))
        .fallback(fallback)
        .with_state(state);

    let router = match assets {
        Some(directory) => public.merge(
            Router::new()
                .route("/images/{file}", get(serve_image))
                .with_state(directory),
        ),
        None => public,
    };

    router.layer(middleware::from_fn(trace_requests))
}

async fn all_posts(State(state): State<HttpState>, Path(filter): Path<String>) -> Response {
    match state.site.listing(&filter).await {
        Ok(entries) => {
            let served = ContentServed::new("listing", filter.as_str(), entries.len());
            served.attach(render_template_response(
                PostListTemplate::new(filter, entries),
                StatusCode::OK,
            ))
        }
        Err(err) => err.into_response(),
    }
}

async fn post_content(State(state): State<HttpState>, Path(id): Path<String>) -> Response {
    match state.site.post_html(&id).await {
        Ok(post) => {
            let served = ContentServed::new("post_fragment", id.as_str(), post.summary.fragments);
            served.attach(render_template_response(
                PostContentTemplate {
                    id,
                    body: post.html,
                },
                StatusCode::OK,
            ))
        }
        Err(err) => err.into_response(),
    }
}

async fn post_page(State(state): State<HttpState>, Path(id): Path<String>) -> Response {
    match state.site.post_html(&id).await {
        Ok(post) => {
            let served = ContentServed::new("post_page", id.as_str(), post.summary.fragments);
            served.attach(render_template_response(
                PostTemplate::new(id, post.html),
                StatusCode::OK,
            ))
        }
        Err(err) => err.into_response(),
    }
}

async fn reading_now(State(state): State<HttpState>) -> Response {
    match state.site.reading_now().await {
        Ok(books) => {
            let served = ContentServed::new(
                "reading_now",
                state.site.sources().reading_now_block_id.as_str(),
                books.len(),
            );
            served.attach(render_template_response(
                ReadingNowTemplate::new(books),
                StatusCode::OK,
            ))
        }
        Err(err) => err.into_response(),
    }
}

async fn reviews(State(state): State<HttpState>) -> Response {
    match state.reviews.list().await {
        Ok(summaries) => {
            let served = ContentServed::new("reviews", "reviews", summaries.len());
            served.attach(render_template_response(
                ReviewListTemplate::new(summaries),
                StatusCode::OK,
            ))
        }
        Err(err) => AppError::from(err).into_response(),
    }
}

async fn review(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    match state.reviews.find(&slug).await {
        Ok(Some(review)) => {
            let served = ContentServed::new("review", slug.as_str(), 1);
            served.attach(render_template_response(
                ReviewTemplate::from(review),
                StatusCode::OK,
            ))
        }
        Ok(None) => render_not_found_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn fallback() -> Response {
    render_not_found_response()
}
