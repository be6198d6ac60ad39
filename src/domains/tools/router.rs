//! Tool Router - builds the rmcp ToolRouter used by the STDIO transport.

use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;

use crate::core::config::Config;

use super::definitions::{FilecoinApi, MinerPenaltyTool};

/// Build the tool router with all registered tools.
pub fn build_tool_router<S>(config: Arc<Config>, api: Arc<FilecoinApi>) -> ToolRouter<S>
where
    S: Send + Sync + 'static,
{
    ToolRouter::new().with_route(MinerPenaltyTool::create_route(config, api))
}

#[cfg(test)]
mod tests {
    use super::super::registry::ToolRegistry;
    use super::*;
    use std::time::Duration;

    struct TestServer {}

    fn api() -> Arc<FilecoinApi> {
        Arc::new(FilecoinApi::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap())
    }

    #[test]
    fn test_registry_matches_router() {
        let config = Arc::new(Config::default());
        let registry = ToolRegistry::new(config.clone(), api());

        let router: ToolRouter<TestServer> = build_tool_router(config, api());
        let router_tools = router.list_all();
        let router_names: Vec<_> = router_tools.iter().map(|t| t.name.as_ref()).collect();

        assert_eq!(router_names, registry.tool_names());
    }
}
