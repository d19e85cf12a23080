//! Per-entity template rendering
//!
//! Turns a typed entity config into the KDL fragment the proxy reads.
//! Rendering is deliberately minimal: directives whose absence already means
//! the default are omitted, except in the global block which always spells
//! out every field. Directive order within a block is fixed per kind.

use ferryman_core::{
    EntityConfig, EntityKind, Error, GlobalSettings, LoadBalancerConfig, ReverseProxyConfig,
    Result, StaticFileConfig,
};
use ferryman_kdl::Node;

/// Render a fragment for `kind`.
///
/// The kind/config pairing is normally enforced by the caller, but rendering
/// is a semantic boundary, so a mismatched pairing is rejected rather than
/// trusted.
pub fn render(kind: EntityKind, config: &EntityConfig) -> Result<String> {
    if config.kind() != kind {
        return Err(Error::TypeMismatch {
            expected: kind,
            found: config.kind(),
        });
    }

    let node = match config {
        EntityConfig::Global(c) => render_global(c),
        EntityConfig::ReverseProxy(c) => render_reverse_proxy(c),
        EntityConfig::LoadBalancer(c) => render_load_balancer(c),
        EntityConfig::StaticFile(c) => render_static_file(c),
    };

    Ok(node.to_text())
}

/// The wildcard block always emits every field; defaults are not suppressed
/// here because the global block is the place where effective values are
/// meant to be visible.
fn render_global(c: &GlobalSettings) -> Node {
    let mut node = Node::new("*")
        .child(Node::new("default_http_port").arg(c.http_port as i64))
        .child(Node::new("default_https_port").arg(c.https_port as i64));

    let protocols: Vec<&str> = [
        ("h1", c.h1_enabled),
        ("h2", c.h2_enabled),
        ("h3", c.h3_enabled),
    ]
    .iter()
    .filter(|(_, enabled)| *enabled)
    .map(|(name, _)| *name)
    .collect();

    // With nothing enabled the directive disappears entirely
    if !protocols.is_empty() {
        let mut directive = Node::new("protocols");
        for protocol in protocols {
            directive = directive.arg(protocol);
        }
        node = node.child(directive);
    }

    node.child(Node::new("timeout").arg(c.timeout_ms))
        .child(Node::new("cache_max_entries").arg(c.cache_max_entries))
}

fn render_reverse_proxy(c: &ReverseProxyConfig) -> Node {
    let mut proxy = Node::new("proxy").arg(c.backend_url.as_str());
    if let Some(socket) = &c.unix_socket_path {
        proxy = proxy.prop("unix", socket.as_str());
    }

    let mut node = Node::new(c.virtual_host_name.as_str()).child(proxy);
    node = append_cache_block(node, c.cache, c.cache_max_age);
    if c.preserve_host_header {
        node = node.child(host_preservation());
    }
    node
}

fn render_load_balancer(c: &LoadBalancerConfig) -> Node {
    let mut proxy = Node::new("proxy");
    for backend in &c.backend_urls {
        proxy = proxy.arg(backend.as_str());
    }

    let mut node = Node::new(c.virtual_host_name.as_str()).child(proxy);
    if c.health_check {
        node = node
            .child(Node::new("lb_health_check"))
            .child(Node::new("lb_health_check_max_fails").arg(c.health_check_max_fails as i64))
            .child(Node::new("lb_health_check_window").arg(c.health_check_window_ms));
    }
    node = append_cache_block(node, c.cache, c.cache_max_age);
    if c.preserve_host_header {
        node = node.child(host_preservation());
    }
    node
}

fn render_static_file(c: &StaticFileConfig) -> Node {
    let mut node =
        Node::new(c.virtual_host_name.as_str()).child(Node::new("root").arg(c.root_dir.as_str()));

    if c.spa {
        node = node.child(
            Node::new("rewrite")
                .arg("^/.*")
                .arg("/")
                .prop("directory", false)
                .prop("file", false)
                .prop("last", true),
        );
    }
    // On is the format's implicit default; only an explicit off is emitted
    if !c.compressed {
        node = node.child(Node::new("compressed").arg(false));
    }
    if c.directory_listing {
        node = node.child(Node::new("directory_listing"));
    }
    node = append_cache_block(node, c.cache, c.cache_max_age);
    if c.precompressed {
        node = node.child(Node::new("precompressed"));
    }
    node
}

fn append_cache_block(node: Node, cache: bool, max_age: u64) -> Node {
    if !cache {
        return node;
    }
    node.child(Node::new("cache"))
        .child(Node::new("file_cache_control").arg(format!("max-age={max_age}")))
}

fn host_preservation() -> Node {
    Node::new("proxy_request_header_replace")
        .arg("Host")
        .arg("{header:Host}")
}
