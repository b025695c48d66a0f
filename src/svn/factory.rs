//! Backend selection

use crate::config::{Backend, Settings};
use crate::error::Result;
use crate::svn::{HttpSvnService, SvnCli, SvnService};
use std::sync::Arc;
use tracing::debug;

/// Create the svn service selected by `settings`
pub fn create_svn_service(settings: &Settings) -> Result<Arc<dyn SvnService>> {
    match settings.backend {
        Backend::Cli => {
            debug!(program = %settings.svn_program, "using svn command-line backend");
            Ok(Arc::new(SvnCli::new(settings.svn_program.clone())))
        }
        Backend::Http => {
            debug!(url = %settings.api_url, "using HTTP merge backend");
            Ok(Arc::new(HttpSvnService::new(&settings.api_url)?))
        }
    }
}
