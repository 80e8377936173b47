pub(crate) mod backends;
pub(crate) mod context;
pub(crate) mod store;

pub(crate) mod prelude {
    #[allow(unused_imports)]
    pub(crate) use super::{
        backends::{DISTRIBUTION_DOMAIN, ORIGIN_ENDPOINT_URI, RTMP_URI},
        context::TestContext,
    };
}
