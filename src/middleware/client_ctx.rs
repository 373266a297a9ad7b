use crate::permission::{self, Access, Owned};
use crate::session::{self, FlashMessage, Level};
use crate::user::{get_client_user, profile_url, ClientUser};
use actix_session::{Session, SessionExt};
use actix_utils::future::{ok, Ready};
use actix_web::dev::{
    forward_ready, Extensions, Payload, Service, ServiceRequest, ServiceResponse, Transform,
};
use actix_web::error::{self, InternalError};
use actix_web::http::header;
use actix_web::{web::Data, Error, FromRequest, HttpMessage, HttpRequest, HttpResponse};
use futures_util::future::{FutureExt as _, LocalBoxFuture};
use sea_orm::DatabaseConnection;
use std::time::{Duration, Instant};
use std::{cell::RefCell, rc::Rc};

/// Client data stored for a single request cycle.
/// Distinct from ClientCtx because it is defined through request data.
pub struct ClientCtxInner {
    pub client: Option<ClientUser>,
    pub session: Option<Session>,
    /// Path and query of the current request, used as the login `next` target.
    pub path: String,
    pub request_start: Instant,
}

impl Default for ClientCtxInner {
    fn default() -> Self {
        Self {
            client: None,
            session: None,
            path: "/".to_owned(),
            request_start: Instant::now(),
        }
    }
}

/// Client context passed to routes.
/// Wraps ClientCtxInner, which is set at the beginning of the request.
#[derive(Clone, Default)]
pub struct ClientCtx(Rc<RefCell<ClientCtxInner>>);

impl ClientCtx {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_client_ctx(extensions: &mut Extensions) -> Self {
        match extensions.get::<Rc<RefCell<ClientCtxInner>>>() {
            // Existing record in extensions; pull it.
            Some(s_impl) => Self(Rc::clone(s_impl)),
            // No existing record; create and insert it.
            None => {
                let inner = Rc::new(RefCell::new(ClientCtxInner::default()));
                extensions.insert(inner.clone());
                Self(inner)
            }
        }
    }

    /// Context of a request that already went through the middleware.
    pub fn from_request_extensions(req: &HttpRequest) -> Self {
        Self::get_client_ctx(&mut req.extensions_mut())
    }

    /// Returns either the user's id or None.
    pub fn get_id(&self) -> Option<i32> {
        self.0.borrow().client.as_ref().map(|u| u.id)
    }

    /// Returns either the user's name or the word for guest.
    pub fn get_name(&self) -> String {
        match &self.0.borrow().client {
            Some(user) => user.username.to_owned(),
            None => "Guest".to_owned(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.0.borrow().client.is_some()
    }

    pub fn is_user_id(&self, user_id: &i32) -> bool {
        self.get_id() == Some(*user_id)
    }

    pub fn get_profile_url(&self) -> String {
        profile_url(&self.get_name())
    }

    /// The error returned when a guest hits a members-only route.
    /// It redirects to the login page and back to where the guest was.
    pub fn login_required(&self) -> Error {
        let next: String =
            url::form_urlencoded::byte_serialize(self.0.borrow().path.as_bytes()).collect();
        InternalError::from_response(
            "You must be logged in to do that.",
            HttpResponse::Found()
                .append_header((header::LOCATION, format!("/auth/login/?next={}", next)))
                .finish(),
        )
        .into()
    }

    /// Returns the user id, or an error redirecting guests to the login page.
    pub fn require_user(&self) -> Result<i32, Error> {
        self.get_id().ok_or_else(|| self.login_required())
    }

    /// Only the owner may pass.
    pub fn require_owner<R: Owned + ?Sized>(&self, resource: &R) -> Result<(), Error> {
        match permission::check(self.get_id(), resource) {
            Access::Allowed => Ok(()),
            Access::LoginRequired => Err(self.login_required()),
            Access::Forbidden => Err(error::ErrorForbidden(
                "You do not have permission to do that.",
            )),
        }
    }

    /// Queues a flash message for the next rendered page.
    pub fn add_message(&self, level: Level, text: &str) {
        match &self.0.borrow().session {
            Some(cookies) => session::push_message(cookies, level, text),
            None => log::warn!("add_message: no session for message {:?}", text),
        }
    }

    /// Consumes queued flash messages. Called by the page container.
    pub fn take_messages(&self) -> Vec<FlashMessage> {
        match &self.0.borrow().session {
            Some(cookies) => session::take_messages(cookies),
            None => Vec::new(),
        }
    }

    /// Returns Duration representing request time.
    pub fn request_time(&self) -> Duration {
        Instant::now() - self.0.borrow().request_start
    }

    /// Returns human readable representing request time.
    pub fn request_time_as_string(&self) -> String {
        let us = self.request_time().as_micros();
        if us > 5000 {
            format!("{}ms", us / 1000)
        } else {
            format!("{}μs", us)
        }
    }
}

/// This implementation is what actually provides the `client: ClientCtx` in the parameters of route functions.
impl FromRequest for ClientCtx {
    /// The associated error which can be returned.
    type Error = Error;
    /// Future that resolves to a Self.
    type Future = Ready<Result<Self, Self::Error>>;

    /// Create a Self from request parts asynchronously.
    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ok(ClientCtx::from_request_extensions(req))
    }
}

impl<S, B> Transform<S, ServiceRequest> for ClientCtx
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = ClientCtxMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ClientCtxMiddleware {
            service: Rc::new(service),
        })
    }
}

/// Client context middleware
pub struct ClientCtxMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ClientCtxMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        async move {
            let cookies = req.get_session();
            let db = req.app_data::<Data<DatabaseConnection>>().cloned();
            let ctx = ClientCtx::get_client_ctx(&mut req.extensions_mut());

            let client = match (session::get_user_id(&cookies), db) {
                (Some(user_id), Some(db)) => match get_client_user(&db, user_id).await {
                    Ok(Some(user)) => Some(user),
                    Ok(None) => {
                        log::warn!("ClientCtxMiddleware: session for missing user {}", user_id);
                        session::forget(&cookies);
                        None
                    }
                    Err(e) => {
                        log::error!("ClientCtxMiddleware: get_client_user(): {}", e);
                        None
                    }
                },
                (Some(_), None) => {
                    log::error!("ClientCtxMiddleware: no database connection available");
                    None
                }
                (None, _) => None,
            };

            {
                let mut inner = ctx.0.borrow_mut();
                inner.client = client;
                inner.session = Some(cookies);
                inner.path = req
                    .uri()
                    .path_and_query()
                    .map(|pq| pq.as_str().to_owned())
                    .unwrap_or_else(|| req.path().to_owned());
            }

            service.call(req).await
        }
        .boxed_local()
    }
}
