use super::*;
use log::{error, info, warn};
use auth::{AuthError, CallerIdentity, IdentityOracle};
pub use rides::RideError;
use rides::{Invariant, RideService};
use rocket::request::{Request, FromRequest, Outcome};
use rocket::response::{self, Responder, Response, status::Custom};
use serde_json::{json, Value};

/// Name of the private cookie holding the session credential
pub const SESSION_COOKIE: &str = "token";

/// Seconds a client should wait before retrying a retriable failure
pub const RETRY_AFTER_SECS: u64 = 1;

// Models for Input Check
#[derive(Deserialize, Debug)]
#[serde(crate = "rocket::serde")]
pub struct UserIdBody {
    #[serde(rename = "userId", default)]
    pub user_id: String,
}

#[derive(Deserialize, Debug)]
#[serde(crate = "rocket::serde")]
pub struct DriverIdBody {
    #[serde(rename = "driverId", default)]
    pub driver_id: String,
}

// Utils struct for rocket::manage
pub struct RideState {
    pub service: RideService,
}

pub struct OracleState {
    pub oracle: Box<dyn IdentityOracle>,
}

/// The authenticated caller of a request
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub CallerIdentity);

// Checking that a user is connected
#[rocket::async_trait]
impl<'r> FromRequest<'r> for Caller {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Caller, AuthError> {
        let route = match request.route() {
            None => "Unknown Route".to_string(),
            Some(value) => format!("{}", value),
        };
        let method = request.method();

        let oracle = match request.rocket().state::<OracleState>() {
            Some(value) => value,
            None => {
                error!("No identity oracle is managed, refusing {}", route);
                return Outcome::Error((Status::InternalServerError, AuthError::MissingCredential));
            },
        };

        let token = match request.cookies().get_private(SESSION_COOKIE) {
            Some(value) => value,
            None => return Outcome::Error((Status::Unauthorized, AuthError::MissingCredential)),
        };

        match oracle.oracle.authenticate(token.value()) {
            Ok(identity) => {
                info!("Client>>Server:\t{} is trying to access route: {} as {}", identity, route, method);
                Outcome::Success(Caller(identity))
            },
            Err(value) => {
                warn!("Client>>Server:\trejected credential on route {}: {}", route, value);
                Outcome::Error((Status::Unauthorized, value))
            },
        }
    }
}

/// Status code for each error kind
pub fn error_status(error: &RideError) -> Status {
    match error {
        // undecodable stored document
        RideError::Validation(Invariant::Malformed(_)) => Status::InternalServerError,
        RideError::InvalidInput(_) | RideError::Validation(_) => Status::BadRequest,
        RideError::NotFound(_) => Status::NotFound,
        RideError::Forbidden(_) => Status::Forbidden,
        RideError::Conflict(_) | RideError::Capacity(_) => Status::Conflict,
        RideError::Precondition(_) => Status::UnprocessableEntity,
        RideError::StoreUnavailable(_) => Status::ServiceUnavailable,
    }
}

impl<'r> Responder<'r, 'static> for RideError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let status = error_status(&self);
        info!("Server>>Client:\tRefusing {} {} with {}: {}", request.method(), request.uri(), status, self);

        let body = json!({
            "success": false,
            "error":   self.kind(),
            "message": self.to_string(),
        });
        let retriable = self.is_retriable();
        let mut response = Response::build_from(Custom(status, Json(body)).respond_to(request)?);
        if retriable {
            response.raw_header("Retry-After", RETRY_AFTER_SECS.to_string());
        }
        response.ok()
    }
}

/// Successful response body
pub fn ok(message: &str, extra: Value) -> Json<Value> {
    let mut body = json!({ "success": true, "message": message });
    if let (Some(body), Value::Object(extra)) = (body.as_object_mut(), extra) {
        body.extend(extra);
    }
    Json(body)
}

/// Body errors become invalid input instead of rocket's default 4xx
pub fn body_or_invalid<T>(body: Result<Json<T>, JsonError<'_>>) -> Result<T, RideError> {
    body.map(|inner| inner.into_inner())
        .map_err(|value| RideError::InvalidInput(format!("invalid JSON in request body: {}", value)))
}
