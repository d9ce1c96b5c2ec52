//! Access control list middleware.
//! This middleware can be placed on any route or service.
//!
//! It validates the access token on the incoming request and checks the claims against the required roles for the
//! route. If the token is valid and the user has the required roles, the request continues, and the validated
//! claims are left in the request extensions for handlers to pick up. Otherwise a 401/403 response is returned.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use bazaar_engine::db_types::Role;
use futures::{
    future::{ok, Ready},
    Future,
};

use crate::auth::extract_claims;

pub struct AclMiddlewareFactory {
    required_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(required_roles: &[Role]) -> Self {
        AclMiddlewareFactory { required_roles: required_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AclMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { required_roles: self.required_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    required_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let claims = extract_claims(req.request())?;
            // Admins satisfy every role requirement
            if required_roles.iter().all(|role| claims.role == *role || claims.is_admin()) {
                req.extensions_mut().insert(claims);
                service.call(req).await
            } else {
                log::debug!("💻️ User {} lacks the required roles {required_roles:?}", claims.sub);
                Err(actix_web::error::ErrorForbidden("Insufficient permissions"))
            }
        })
    }
}
