use rocket::{Request, catch, serde::json::Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorMessage {
    message: String,
    status: u16,
}

fn error_message(message: &str, status: u16) -> Json<ErrorMessage> {
    Json(ErrorMessage {
        message: message.into(),
        status,
    })
}

#[catch(400)]
pub fn bad_request(_req: &Request) -> Json<ErrorMessage> {
    error_message("Invalid request parameters.", 400)
}

#[catch(401)]
pub fn unauthorized(req: &Request) -> Json<ErrorMessage> {
    let message = match req.headers().get_one("Authorization") {
        Some(_) => "Not authorized, token failed",
        None => "Not authorized, no token",
    };
    error_message(message, 401)
}

#[catch(403)]
pub fn forbidden(_req: &Request) -> Json<ErrorMessage> {
    error_message("Not authorized as an admin", 403)
}

#[catch(404)]
pub fn not_found(_req: &Request) -> Json<ErrorMessage> {
    error_message("The requested resource was not found.", 404)
}

#[catch(500)]
pub fn internal_error(_req: &Request) -> Json<ErrorMessage> {
    error_message("An internal server error occurred.", 500)
}
