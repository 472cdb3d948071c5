//! Small declarative helpers shared by the HTTP binaries.

#[cfg(feature = "actix")]
#[doc(hidden)]
pub use actix_web;

/// Generate a `pub fn routes(&mut ServiceConfig)` registering every listed
/// actix-web handler, and every listed child module's own `routes`.
///
/// ```ignore
/// macros_utils::routes! {
///     route health_route,
///     mount monitors,
/// }
/// ```
#[cfg(feature = "actix")]
#[macro_export]
macro_rules! routes {
    (@entry $cfg:ident, route $handler:tt) => {
        $cfg.service($handler);
    };
    (@entry $cfg:ident, mount $module:tt) => {
        $module::routes($cfg);
    };
    ($($kind:ident $item:tt),* $(,)?) => {
        pub fn routes(cfg: &mut $crate::actix_web::web::ServiceConfig) {
            $($crate::routes!(@entry cfg, $kind $item);)*
        }
    };
}
