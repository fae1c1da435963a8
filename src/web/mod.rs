pub mod form;
pub mod pages;
pub mod route;
pub mod router;
pub mod routes;

pub use route::{Context, Request, Response, ResponseModifier, Route, Template};
pub use router::Router;
pub use routes::{all_routes, RouteServices};
