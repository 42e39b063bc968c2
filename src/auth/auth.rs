use crate::model::{Identity, Matricula, Role};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use futures::future::{Ready, ready};

/// Caller placed in request extensions by the bearer middleware.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(ErrorUnauthorized("Missing token"))),
        }
    }
}

impl AuthUser {
    pub fn identity(&self) -> &Identity {
        &self.0
    }

    pub fn matricula(&self) -> &Matricula {
        &self.0.matricula
    }

    pub fn role(&self) -> Role {
        self.0.role
    }
}
