use std::mem;
use std::time::{Duration, Instant};

use log::{debug, info};
use uuid::Uuid;
use warp::{
    http::StatusCode,
    reject,
    reply::{json, with_header, with_status, Reply},
};

use crate::environment::Environment;
use crate::errors::BackendError;
use crate::model::Id;
use crate::repository::Repo;
use crate::routes::{
    query::{LoginForm, PageQuery, PlaylistQuery, RegistrationForm, ReviewForm, SearchQuery},
    rejection::{Context, Rejection},
    response::SuccessResponse,
};
use crate::services::{self, Page};

pub const SESSION_COOKIE: &str = "podlib_session";

const SERVER_TIMING_HEADER: &str = "server-timing";
const SET_COOKIE_HEADER: &str = "set-cookie";
type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

/// Runs the body against a repository session of its own, bound to
/// `$repo`, closing it again whether or not the body succeeds, and reports
/// the time taken.
macro_rules! scoped {
    ($environment:expr, $repo:ident, $context:expr, $body:block) => {{
        let start = Instant::now();
        let scope = $environment.repo.open_session();

        scope
            .reset_session()
            .await
            .map_err(|e| Rejection::new($context, e.into()))?;

        let result: Result<_, reject::Rejection> = {
            let $repo: &Repo = &*scope;

            async { Ok($body) }.await
        };

        scope
            .close_session()
            .await
            .map_err(|e| Rejection::new($context, e.into()))?;

        Ok(Box::new(with_header(
            result?,
            SERVER_TIMING_HEADER,
            format_server_timing(start.elapsed()),
        )) as Box<dyn Reply>)
    }};
}

pub async fn home(environment: Environment) -> RouteResult {
    scoped!(environment, repo, Context::home(), {
        let error_handler = |e: BackendError| Rejection::new(Context::home(), e);

        let podcast_count = services::podcasts::get_number_of_podcasts(repo)
            .await
            .map_err(error_handler)?;
        let categories = services::utilities::get_category_names(repo)
            .await
            .map_err(error_handler)?;
        let podcasts = services::utilities::get_random_podcasts(environment.config.random_podcasts, repo)
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::Home {
            podcast_count,
            categories,
            podcasts,
        })
    })
}

pub async fn podcasts(environment: Environment, query: PageQuery) -> RouteResult {
    let page = query.page();

    scoped!(environment, repo, Context::podcasts(page), {
        let podcasts = services::podcasts::get_podcast_page(page, environment.config.podcasts_per_page, repo)
            .await
            .map_err(|e| Rejection::new(Context::podcasts(page), e))?;

        json(&SuccessResponse::Podcasts(podcasts))
    })
}

pub async fn podcast(environment: Environment, podcast_id: Id, query: PageQuery) -> RouteResult {
    scoped!(environment, repo, Context::podcast(podcast_id), {
        let mut podcast = services::podcasts::get_podcast(podcast_id, repo)
            .await
            .map_err(|e| Rejection::new(Context::podcast(podcast_id), e))?;

        let episodes = Page::of(
            mem::take(&mut podcast.episodes),
            query.page(),
            environment.config.episodes_per_page,
        );

        json(&SuccessResponse::Podcast { podcast, episodes })
    })
}

pub async fn episode(
    environment: Environment,
    podcast_id: Id,
    episode_id: Id,
    query: PageQuery,
    session: Option<String>,
) -> RouteResult {
    let context = || Context::episode(podcast_id, episode_id);

    scoped!(environment, repo, context(), {
        let error_handler = |e: BackendError| Rejection::new(context(), e);

        current_user(&environment, session).map_err(error_handler)?;

        let podcast = services::podcasts::get_podcast_summary(podcast_id, repo)
            .await
            .map_err(error_handler)?;
        let mut episode = services::episodes::get_episode(episode_id, repo)
            .await
            .map_err(error_handler)?;

        if episode.podcast_id != podcast_id {
            return Err(error_handler(BackendError::NonExistentEpisode(episode_id)).into());
        }

        let neighbours = services::episodes::get_neighbours(episode_id, repo)
            .await
            .map_err(error_handler)?;
        let reviews = Page::of(
            mem::take(&mut episode.reviews),
            query.page(),
            environment.config.reviews_per_page,
        );

        json(&SuccessResponse::Episode {
            podcast,
            episode,
            previous: neighbours.previous,
            next: neighbours.next,
            reviews,
        })
    })
}

pub async fn search(environment: Environment, query: SearchQuery) -> RouteResult {
    let SearchQuery { query, filter, page } = query;

    scoped!(environment, repo, Context::search(query.clone()), {
        let results = services::podcasts::search_podcasts(&query, filter, repo)
            .await
            .map_err(|e| Rejection::new(Context::search(query.clone()), e))?;

        let results = Page::of(results, page.unwrap_or(1), environment.config.podcasts_per_page);

        json(&SuccessResponse::Search {
            query: query.clone(),
            filter,
            results,
        })
    })
}

pub async fn categories(environment: Environment) -> RouteResult {
    scoped!(environment, repo, Context::categories(), {
        let categories = services::utilities::get_category_names(repo)
            .await
            .map_err(|e| Rejection::new(Context::categories(), e))?;

        json(&SuccessResponse::Categories { categories })
    })
}

pub async fn review(environment: Environment, session: Option<String>, form: ReviewForm) -> RouteResult {
    let ReviewForm {
        podcast_id,
        episode_id,
        review,
        rating,
    } = form;

    scoped!(environment, repo, Context::review(podcast_id, episode_id), {
        let error_handler = |e: BackendError| Rejection::new(Context::review(podcast_id, episode_id), e);

        let user_name = current_user(&environment, session).map_err(error_handler)?;
        services::episodes::validate_review(&review, rating).map_err(error_handler)?;

        debug!(environment.logger, "Adding review..."; "user_name" => &user_name, "episode_id" => episode_id);
        services::episodes::add_review(podcast_id, episode_id, &review, &user_name, rating, repo)
            .await
            .map_err(error_handler)?;

        let reviews = services::episodes::get_reviews_for_episode(episode_id, repo)
            .await
            .map_err(error_handler)?;

        with_status(
            json(&SuccessResponse::Reviews { episode_id, reviews }),
            StatusCode::CREATED,
        )
    })
}

pub async fn register(environment: Environment, form: RegistrationForm) -> RouteResult {
    let RegistrationForm { user_name, password } = form;

    scoped!(environment, repo, Context::register(user_name.clone()), {
        let error_handler = |e: BackendError| Rejection::new(Context::register(user_name.clone()), e);

        services::authentication::validate_registration(&user_name, &password).map_err(error_handler)?;
        services::authentication::add_user(&user_name, &password, repo)
            .await
            .map_err(error_handler)?;

        let user = services::authentication::get_user(&user_name, repo)
            .await
            .map_err(error_handler)?;

        info!(environment.logger, "Registered user"; "user_id" => user.user_id, "user_name" => &user.user_name);

        with_status(json(&SuccessResponse::User(user)), StatusCode::CREATED)
    })
}

pub async fn login(environment: Environment, form: LoginForm) -> RouteResult {
    let LoginForm { user_name, password } = form;

    scoped!(environment, repo, Context::login(user_name.clone()), {
        let error_handler = |e: BackendError| Rejection::new(Context::login(user_name.clone()), e);

        services::authentication::authenticate_user(&user_name, &password, repo)
            .await
            .map_err(error_handler)?;
        let user = services::authentication::get_user(&user_name, repo)
            .await
            .map_err(error_handler)?;

        let token = environment.sessions.create(user.user_name.clone());
        debug!(environment.logger, "Logged in"; "user_name" => &user.user_name);

        with_header(
            json(&SuccessResponse::User(user)),
            SET_COOKIE_HEADER,
            session_cookie(&token.to_string(), Some(environment.sessions.lifetime().as_secs())),
        )
    })
}

pub async fn logout(environment: Environment, session: Option<String>) -> RouteResult {
    scoped!(environment, _repo, Context::logout(), {
        if let Some(token) = session.as_deref().and_then(|s| Uuid::parse_str(s).ok()) {
            environment.sessions.remove(&token);
        }

        with_header(StatusCode::NO_CONTENT, SET_COOKIE_HEADER, session_cookie("", Some(0)))
    })
}

pub async fn playlist(environment: Environment, session: Option<String>, query: PlaylistQuery) -> RouteResult {
    scoped!(environment, repo, Context::playlist(), {
        let error_handler = |e: BackendError| Rejection::new(Context::playlist(), e);

        let user_name = current_user(&environment, session).map_err(error_handler)?;
        let playlist = services::playlist::get_playlist(&user_name, query.shuffle, repo)
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::Playlist(playlist))
    })
}

pub async fn add_playlist_episode(environment: Environment, episode_id: Id, session: Option<String>) -> RouteResult {
    scoped!(environment, repo, Context::playlist_episode(episode_id), {
        let error_handler = |e: BackendError| Rejection::new(Context::playlist_episode(episode_id), e);

        let user_name = current_user(&environment, session).map_err(error_handler)?;
        services::playlist::add_episode_to_playlist(&user_name, episode_id, repo)
            .await
            .map_err(error_handler)?;

        let playlist = services::playlist::get_playlist(&user_name, false, repo)
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::Playlist(playlist))
    })
}

pub async fn remove_playlist_episode(environment: Environment, episode_id: Id, session: Option<String>) -> RouteResult {
    scoped!(environment, repo, Context::playlist_episode(episode_id), {
        let error_handler = |e: BackendError| Rejection::new(Context::playlist_episode(episode_id), e);

        let user_name = current_user(&environment, session).map_err(error_handler)?;
        services::playlist::remove_episode_from_playlist(&user_name, episode_id, repo)
            .await
            .map_err(error_handler)?;

        let playlist = services::playlist::get_playlist(&user_name, false, repo)
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::Playlist(playlist))
    })
}

pub async fn add_playlist_podcast(environment: Environment, podcast_id: Id, session: Option<String>) -> RouteResult {
    scoped!(environment, repo, Context::playlist_podcast(podcast_id), {
        let error_handler = |e: BackendError| Rejection::new(Context::playlist_podcast(podcast_id), e);

        let user_name = current_user(&environment, session).map_err(error_handler)?;
        let added = services::playlist::add_podcast_to_playlist(&user_name, podcast_id, repo)
            .await
            .map_err(error_handler)?;

        let playlist = services::playlist::get_playlist(&user_name, false, repo)
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::PlaylistPodcast { added, playlist })
    })
}

/// The user name behind the session cookie, if the session is live.
fn current_user(environment: &Environment, session: Option<String>) -> Result<String, BackendError> {
    session
        .and_then(|token| Uuid::parse_str(&token).ok())
        .and_then(|token| environment.sessions.user_name(&token))
        .ok_or(BackendError::NotLoggedIn)
}

fn session_cookie(value: &str, max_age: Option<u64>) -> String {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, value);

    if let Some(max_age) = max_age {
        cookie.push_str(&format!("; Max-Age={}", max_age));
    }

    cookie
}

fn format_server_timing(seconds: Duration) -> String {
    format!("handler;dur={}", seconds.as_secs_f64() * 1000.0)
}
