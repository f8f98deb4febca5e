use std::any::Any;
use std::thread;

use pretty_assertions::assert_eq;
use regex::Regex;

use super::*;
use crate::attributes::Attributes;
use crate::context::ContextRequest;
use crate::error::HostError;
use crate::host::memory::{MemoryHost, RegistrationId};

#[derive(Debug)]
struct Node {
	path: String,
}

fn node(path: &str) -> Node {
	Node { path: path.to_owned() }
}

struct Req {
	node: Option<Node>,
}

impl ContextRequest<Node> for Req {
	fn context(&self) -> Option<&Node> {
		self.node.as_ref()
	}
}

trait LinkSpi: CapabilityMatcher<Node> + Send + Sync {
	fn name(&self) -> &str;
}

struct PathRule {
	name: &'static str,
	pattern: Regex,
}

impl CapabilityMatcher<Node> for PathRule {
	fn matches(&self, node: Option<&Node>) -> bool {
		node.is_some_and(|n| self.pattern.is_match(&n.path))
	}
}

impl LinkSpi for PathRule {
	fn name(&self) -> &str {
		self.name
	}
}

struct Fallback;

impl CapabilityMatcher<Node> for Fallback {
	fn matches(&self, _node: Option<&Node>) -> bool {
		true
	}

	fn supports_null_context(&self) -> bool {
		true
	}
}

impl LinkSpi for Fallback {
	fn name(&self) -> &str {
		"default"
	}
}

type Engine = Resolver<Node, MemoryHost>;

fn rule(name: &'static str, pattern: &str) -> Arc<dyn LinkSpi> {
	Arc::new(PathRule {
		name,
		pattern: Regex::new(pattern).unwrap(),
	})
}

/// The usual content tree: a general rule and two more specific, higher ranked ones.
fn content_host() -> MemoryHost {
	let host = MemoryHost::new();
	host.register(rule("content", r"^/content(/.*)?$"), Attributes::ranked(100))
		.unwrap();
	host.register(rule("dam", r"^/content/dam(/.*)?$"), Attributes::ranked(200))
		.unwrap();
	host.register(rule("sample", r"^/content/sample(/.*)?$"), Attributes::ranked(300))
		.unwrap();
	host
}

fn with_default(host: &MemoryHost) -> RegistrationId {
	let fallback: Arc<dyn LinkSpi> = Arc::new(Fallback);
	host.register(fallback, Attributes::ranked(i32::MIN)).unwrap()
}

fn name_of(found: Option<Arc<dyn LinkSpi>>) -> Option<String> {
	found.map(|s| s.name().to_owned())
}

fn names(found: Vec<Arc<dyn LinkSpi>>) -> Vec<String> {
	found.iter().map(|s| s.name().to_owned()).collect()
}

#[test]
fn resolve_prefers_highest_ranked_match() {
	let engine = Engine::new(content_host(), ResolverConfig::default());

	let cases = [
		("/content/dam/asset.png", Some("dam")),
		("/content/sample/en", Some("sample")),
		("/content/other", Some("content")),
		("/content", Some("content")),
		("/etc/tags", None),
	];
	for (path, expected) in cases {
		assert_eq!(
			name_of(engine.resolve::<dyn LinkSpi>(&node(path)).unwrap()),
			expected.map(str::to_owned),
			"{path}"
		);
	}
}

#[test]
fn resolve_all_lists_matches_in_rank_order() {
	let host = content_host();
	with_default(&host);
	let engine = Engine::new(host, ResolverConfig::default());

	assert_eq!(
		names(engine.resolve_all::<dyn LinkSpi>(&node("/content/dam/a")).unwrap()),
		vec!["dam", "content", "default"]
	);
	assert_eq!(
		names(engine.resolve_all::<dyn LinkSpi>(&node("/etc")).unwrap()),
		vec!["default"]
	);
}

#[test]
fn default_candidate_catches_unmatched_paths() {
	let host = content_host();
	let engine = Engine::new(host.clone(), ResolverConfig::default());
	assert!(engine.resolve::<dyn LinkSpi>(&node("/etc")).unwrap().is_none());

	with_default(&host);
	assert_eq!(
		name_of(engine.resolve::<dyn LinkSpi>(&node("/etc")).unwrap()),
		Some("default".into())
	);
	assert_eq!(
		name_of(engine.resolve::<dyn LinkSpi>(&node("/content/dam")).unwrap()),
		Some("dam".into())
	);
}

#[test]
fn absent_context_only_reaches_null_capable_candidates() {
	let host = content_host();
	let engine = Engine::new(host.clone(), ResolverConfig::default());

	assert!(engine.resolve::<dyn LinkSpi>(Input::<Node>::None).unwrap().is_none());
	assert!(engine.resolve_all::<dyn LinkSpi>(None::<&Node>).unwrap().is_empty());

	with_default(&host);
	assert_eq!(
		names(engine.resolve_all::<dyn LinkSpi>(Input::<Node>::None).unwrap()),
		vec!["default"]
	);
}

#[test]
fn request_input_resolves_against_its_context() {
	let host = content_host();
	with_default(&host);
	let engine = Engine::new(host, ResolverConfig::default());

	let req = Req {
		node: Some(node("/content/sample/page")),
	};
	assert_eq!(
		name_of(engine.resolve::<dyn LinkSpi>(Input::<Node>::request(&req)).unwrap()),
		Some("sample".into())
	);

	let bare = Req { node: None };
	assert_eq!(
		name_of(engine.resolve::<dyn LinkSpi>(Input::<Node>::request(&bare)).unwrap()),
		Some("default".into())
	);
}

#[test]
fn other_input_is_downcast_or_treated_as_absent() {
	let engine = Engine::new(content_host(), ResolverConfig::default());

	let n = node("/content/dam/x");
	let as_any: &dyn Any = &n;
	assert_eq!(
		name_of(engine.resolve::<dyn LinkSpi>(Input::<Node>::other(as_any)).unwrap()),
		Some("dam".into())
	);

	let unrelated = String::from("/content/dam/x");
	assert!(
		engine
			.resolve::<dyn LinkSpi>(Input::<Node>::other(&unrelated))
			.unwrap()
			.is_none()
	);
}

#[test]
fn custom_extractor_maps_foreign_inputs() {
	struct Envelope {
		target: Node,
	}

	struct EnvelopeExtractor;

	impl ContextExtractor<Node> for EnvelopeExtractor {
		fn extract<'a>(&self, input: Input<'a, Node>) -> Option<&'a Node> {
			match input {
				Input::Other(value) => value.downcast_ref::<Envelope>().map(|e| &e.target),
				other => StandardExtractor.extract(other),
			}
		}
	}

	let engine = Resolver::<Node, _, _>::with_extractor(
		content_host(),
		ResolverConfig::default(),
		EnvelopeExtractor,
	);
	let envelope = Envelope {
		target: node("/content/sample/x"),
	};
	assert_eq!(
		name_of(engine.resolve::<dyn LinkSpi>(Input::<Node>::other(&envelope)).unwrap()),
		Some("sample".into())
	);
	assert_eq!(
		name_of(engine.resolve::<dyn LinkSpi>(&node("/content/a")).unwrap()),
		Some("content".into())
	);
}

#[test]
fn registrations_after_first_resolution_are_visible() {
	let host = MemoryHost::new();
	let engine = Engine::new(host.clone(), ResolverConfig::default());
	assert!(engine.resolve::<dyn LinkSpi>(&node("/content/a")).unwrap().is_none());

	let general = host
		.register(rule("content", r"^/content(/.*)?$"), Attributes::ranked(100))
		.unwrap();
	assert_eq!(
		name_of(engine.resolve::<dyn LinkSpi>(&node("/content/a")).unwrap()),
		Some("content".into())
	);

	host.register(rule("specific", r"^/content/a$"), Attributes::ranked(500))
		.unwrap();
	assert_eq!(
		name_of(engine.resolve::<dyn LinkSpi>(&node("/content/a")).unwrap()),
		Some("specific".into())
	);

	host.unregister(general).unwrap();
	assert_eq!(
		names(engine.resolve_all::<dyn LinkSpi>(&node("/content/a")).unwrap()),
		vec!["specific"]
	);
	assert!(engine.resolve::<dyn LinkSpi>(&node("/content/b")).unwrap().is_none());
}

#[test]
fn subscription_failure_surfaces_and_is_retried() {
	let host = content_host();
	host.reject_subscriptions::<dyn LinkSpi>("registry restarting");
	let engine = Engine::new(host.clone(), ResolverConfig::default());

	let err = engine
		.resolve::<dyn LinkSpi>(&node("/content/a"))
		.err()
		.unwrap();
	assert_eq!(err.point(), ExtensionPoint::of::<dyn LinkSpi>());
	assert!(matches!(
		err,
		ResolveError::Subscribe {
			source: HostError::Rejected { .. },
			..
		}
	));
	assert!(engine.resolve_all::<dyn LinkSpi>(&node("/content/a")).is_err());

	host.accept_subscriptions::<dyn LinkSpi>();
	assert_eq!(
		name_of(engine.resolve::<dyn LinkSpi>(&node("/content/a")).unwrap()),
		Some("content".into())
	);
}

#[test]
fn shutdown_releases_everything() {
	let host = content_host();
	with_default(&host);
	let engine = Engine::new(host.clone(), ResolverConfig::default());
	assert!(engine.resolve::<dyn LinkSpi>(&node("/content")).unwrap().is_some());
	assert_eq!(host.listener_count::<dyn LinkSpi>(), 1);

	engine.shutdown();
	engine.shutdown();

	assert!(engine.is_shut_down());
	assert_eq!(host.listener_count::<dyn LinkSpi>(), 0);
	assert!(engine.resolve::<dyn LinkSpi>(&node("/content")).unwrap().is_none());
	assert!(engine.resolve_all::<dyn LinkSpi>(Input::<Node>::None).unwrap().is_empty());
	assert_eq!(host.listener_count::<dyn LinkSpi>(), 0);
}

#[test]
fn evict_resubscribes_on_next_resolution() {
	let host = content_host();
	let engine = Engine::new(host.clone(), ResolverConfig::default());
	engine.resolve::<dyn LinkSpi>(&node("/content")).unwrap();

	assert!(engine.evict::<dyn LinkSpi>());
	assert!(!engine.evict::<dyn LinkSpi>());
	assert_eq!(host.listener_count::<dyn LinkSpi>(), 0);

	assert_eq!(
		name_of(engine.resolve::<dyn LinkSpi>(&node("/content/dam")).unwrap()),
		Some("dam".into())
	);
	assert_eq!(host.listener_count::<dyn LinkSpi>(), 1);
}

#[test]
fn configured_ranking_key_drives_priority() {
	let host = MemoryHost::new();
	host.register(
		rule("low", "^/"),
		Attributes::new().with("rank", 1).with(crate::DEFAULT_RANKING_KEY, 99),
	)
	.unwrap();
	host.register(rule("high", "^/"), Attributes::new().with("rank", 2))
		.unwrap();

	let config = ResolverConfig {
		ranking_key: "rank".into(),
		..ResolverConfig::default()
	};
	let engine = Engine::new(host, config);

	assert_eq!(
		names(engine.resolve_all::<dyn LinkSpi>(&node("/x")).unwrap()),
		vec!["high", "low"]
	);
	assert_eq!(engine.config().ranking_key, "rank");
}

#[test]
fn concurrent_resolution_during_registration_churn() {
	let host = content_host();
	let engine = Arc::new(Engine::new(host.clone(), ResolverConfig::default()));

	let readers: Vec<_> = (0..4)
		.map(|_| {
			let engine = Arc::clone(&engine);
			thread::spawn(move || {
				for _ in 0..500 {
					let found = engine
						.resolve::<dyn LinkSpi>(&node("/content/dam/a"))
						.unwrap()
						.map(|s| s.name().to_owned());
					// The churned candidate ranks below "dam", so the winner never changes.
					assert_eq!(found.as_deref(), Some("dam"));
				}
			})
		})
		.collect();

	for _ in 0..200 {
		let id = host
			.register(rule("churn", r"^/content/dam(/.*)?$"), Attributes::ranked(150))
			.unwrap();
		host.unregister(id).unwrap();
	}
	for r in readers {
		r.join().unwrap();
	}

	assert_eq!(host.listener_count::<dyn LinkSpi>(), 1);
	assert_eq!(
		names(engine.resolve_all::<dyn LinkSpi>(&node("/content/dam/a")).unwrap()),
		vec!["dam", "content"]
	);
}

#[test]
fn host_shutdown_withdraws_tracked_candidates() {
	let host = content_host();
	with_default(&host);
	let engine = Engine::new(host.clone(), ResolverConfig::default());
	assert_eq!(
		name_of(engine.resolve::<dyn LinkSpi>(&node("/content/dam/x")).unwrap()),
		Some("dam".into())
	);

	host.shut_down();

	assert_eq!(host.registration_count::<dyn LinkSpi>(), 0);
	assert!(engine.resolve::<dyn LinkSpi>(&node("/content/dam/x")).unwrap().is_none());
	assert!(engine.resolve_all::<dyn LinkSpi>(Input::<Node>::None).unwrap().is_empty());
	assert!(engine.cache().get::<dyn LinkSpi>().unwrap().unwrap().is_empty());
}
