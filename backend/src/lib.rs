pub mod accounts;
pub mod auth;
pub mod catchers;
pub mod config;
pub mod cors;
pub mod error;
pub mod processor;
pub mod queries;
pub mod routes;
pub mod store;
pub mod utils;
pub use shared::{models::*, error::*, identity::*};

use rocket::{catchers, routes, Build, Rocket};
use crate::catchers::{bad_request, forbidden, internal_error, not_found, unauthorized};
use crate::cors::CORS;
use crate::routes::*;

pub fn build_rocket(state: AppState, cors_origin: Option<String>) -> Rocket<Build> {
    rocket::build()
        .attach(CORS::new(cors_origin))
        .manage(state)
        .mount(
            "/api",
            routes![
                vote_options,
                submit_vote,
                vote_results,
                my_vote,
                register,
                login,
                list_users,
                get_user,
                update_user,
                delete_user,
                all_options
            ],
        )
        .register(
            "/",
            catchers![
                bad_request,
                unauthorized,
                forbidden,
                not_found,
                internal_error
            ],
        )
}
