use std::sync::Arc;

use log::{error, Logger};
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_status, Json, Reply, WithStatus};
use warp::Filter;

use crate::environment::Environment;
use crate::errors::{BackendError, RepositoryError};

pub mod admin;
mod handlers;
mod query;
mod rejection;
mod response;

pub use handlers::SESSION_COOKIE;
pub use internal::*;

/// The largest form body to accept.
const MAX_CONTENT_LENGTH: u64 = 16 * 1024;

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithStatus<Json>, reject::Rejection> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let e = &r.error;
        error!(logger, "Backend error"; "context" => ?r.context, "error" => ?r.error, "status" => %status_code_for(e), "message" => %r.error);
        let flattened = r.flatten();

        return Ok(with_status(json(&flattened), status_code_for(e)));
    }

    Err(rej)
}

fn status_code_for(e: &BackendError) -> StatusCode {
    use BackendError::*;

    match e {
        InvalidForm(..) | Model(..) => StatusCode::BAD_REQUEST,
        NameNotUnique => StatusCode::FORBIDDEN,
        UnknownUser | Authentication | NotLoggedIn => StatusCode::UNAUTHORIZED,
        NonExistentPodcast(..) | NonExistentEpisode(..) => StatusCode::NOT_FOUND,
        Repository(RepositoryError::PlaylistNotFound { .. })
        | Repository(RepositoryError::EpisodeNotInPlaylist { .. }) => StatusCode::NOT_FOUND,
        Repository(RepositoryError::Constraint(..)) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Every public route, with rejections turned into JSON bodies.
pub fn make_routes(
    environment: Environment,
) -> impl Filter<Extract = (impl Reply,), Error = reject::Rejection> + Clone {
    let logger = environment.logger.clone();

    make_home_route(environment.clone())
        .or(make_podcasts_route(environment.clone()))
        .or(make_podcast_route(environment.clone()))
        .or(make_episode_route(environment.clone()))
        .or(make_search_route(environment.clone()))
        .or(make_categories_route(environment.clone()))
        .or(make_review_route(environment.clone()))
        .or(make_register_route(environment.clone()))
        .or(make_login_route(environment.clone()))
        .or(make_logout_route(environment.clone()))
        .or(make_playlist_route(environment.clone()))
        .or(make_add_playlist_episode_route(environment.clone()))
        .or(make_remove_playlist_episode_route(environment.clone()))
        .or(make_add_playlist_podcast_route(environment))
        .recover(move |r| format_rejection(logger.clone(), r))
}

mod internal {
    use warp::body::{content_length_limit, json as body};
    use warp::cookie::optional as cookie;
    use warp::filters::BoxedFilter;
    use warp::path::end;
    use warp::Filter;
    use warp::Reply;
    use warp::{delete, get as g, path as p, post, query};

    use super::{handlers, query as q, MAX_CONTENT_LENGTH};
    use crate::environment::Environment;
    use crate::model::Id;

    type Route = BoxedFilter<(Box<dyn Reply>,)>;

    macro_rules! route_filter {
    ($route_variable:ident; $first:expr) => (let $route_variable = $route_variable.and($first););
    ($route_variable:ident; $first:expr, $($rest:expr),+) => (
        let $route_variable = $route_variable.and($first);
        route_filter!($route_variable; $($rest),+);
    )
}

    macro_rules! route {
    ($name:ident => $handler:ident, $route_variable:ident; $($filters:expr),+) => (
        pub fn $name(environment: Environment) -> Route {
            let $route_variable = warp::any()
                .map(move || environment.clone());

            route_filter!($route_variable; $($filters),+);

            $route_variable.and_then(handlers::$handler)
                .boxed()
        }
    );
}

    route!(make_home_route => home, rt; end(), g());
    route!(make_podcasts_route => podcasts, rt; p("podcasts"), end(), g(), query::<q::PageQuery>());
    route!(make_podcast_route => podcast, rt; p!("podcasts" / Id), g(), query::<q::PageQuery>());
    route!(make_episode_route => episode, rt; p!("podcasts" / Id / "episodes" / Id), g(), query::<q::PageQuery>(), cookie::<String>(handlers::SESSION_COOKIE));
    route!(make_search_route => search, rt; p("search"), end(), g(), query::<q::SearchQuery>());
    route!(make_categories_route => categories, rt; p("categories"), end(), g());
    route!(make_review_route => review, rt; p("reviews"), end(), post(), cookie::<String>(handlers::SESSION_COOKIE), content_length_limit(MAX_CONTENT_LENGTH), body::<q::ReviewForm>());
    route!(make_register_route => register, rt; p!("authentication" / "register"), post(), content_length_limit(MAX_CONTENT_LENGTH), body::<q::RegistrationForm>());
    route!(make_login_route => login, rt; p!("authentication" / "login"), post(), content_length_limit(MAX_CONTENT_LENGTH), body::<q::LoginForm>());
    route!(make_logout_route => logout, rt; p!("authentication" / "logout"), post(), cookie::<String>(handlers::SESSION_COOKIE));
    route!(make_playlist_route => playlist, rt; p("playlist"), end(), g(), cookie::<String>(handlers::SESSION_COOKIE), query::<q::PlaylistQuery>());
    route!(make_add_playlist_episode_route => add_playlist_episode, rt; p!("playlist" / "episodes" / Id), post(), cookie::<String>(handlers::SESSION_COOKIE));
    route!(make_remove_playlist_episode_route => remove_playlist_episode, rt; p!("playlist" / "episodes" / Id), delete(), cookie::<String>(handlers::SESSION_COOKIE));
    route!(make_add_playlist_podcast_route => add_playlist_podcast, rt; p!("playlist" / "podcasts" / Id), post(), cookie::<String>(handlers::SESSION_COOKIE));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_statuses() {
        assert_eq!(status_code_for(&BackendError::NameNotUnique), StatusCode::FORBIDDEN);
        assert_eq!(status_code_for(&BackendError::NotLoggedIn), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_code_for(&BackendError::NonExistentEpisode(3)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_code_for(&BackendError::InvalidForm("short".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_code_for(&BackendError::Repository(RepositoryError::PlaylistNotFound { user_id: 1 })),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_code_for(&BackendError::PasswordHash("broken".to_owned())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
