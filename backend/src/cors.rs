use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Request, Response};
use rocket::http::Header;

pub struct CORS {
    allowed_origin: Option<String>,
}

impl CORS {
    /// `None` allows any origin.
    pub fn new(allowed_origin: Option<String>) -> Self {
        Self { allowed_origin }
    }

    fn allow<'a>(&'a self, origin: Option<&'a str>) -> Option<&'a str> {
        match (&self.allowed_origin, origin) {
            (None, Some(origin)) => Some(origin),
            (None, None) => Some("*"),
            (Some(allowed), Some(origin)) if allowed == origin => Some(origin),
            _ => None,
        }
    }
}

#[rocket::async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response
        }
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        if let Some(origin) = self.allow(req.headers().get_one("Origin")) {
            res.set_header(Header::new("Access-Control-Allow-Origin", origin.to_string()));
            res.set_header(Header::new("Access-Control-Allow-Methods", "POST, GET, PUT, OPTIONS, DELETE"));
            res.set_header(Header::new("Access-Control-Allow-Headers", "Content-Type, Authorization"));
            res.set_header(Header::new("Access-Control-Max-Age", "86400"));
            res.set_header(Header::new("Vary", "Origin"));
        }
    }
}
