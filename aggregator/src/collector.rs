use crate::AggregatorError;
use crate::request::{AssetRequest, AttributeSignature};
use combiner::codec;
use combiner::config::Config;
use combiner::errors::CombinerError;
use combiner::types::{AssetKind, CanonicalSignature};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Where a declaration sits on the page.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Location {
    /// The preferred structural anchor (document head).
    Head,
    /// A named placeholder region.
    Placeholder(String),
    /// Wherever the declaring component itself renders.
    Inline,
}

/// Handle to a recorded declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeclarationId(usize);

/// A finalized HTML fragment and the destination it belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmittedTag {
    pub owner: DeclarationId,
    pub location: Location,
    pub html: String,
}

struct Declaration {
    request: AssetRequest,
    signature: AttributeSignature,
    location: Location,
    active: bool,
    /// Own keys plus everything merged in. Sorted and deduped only at
    /// finalization, so late merges stay cheap.
    group: Vec<String>,
    /// Set once this declaration merged into another; inert
    /// declarations render nothing and accept no further merges.
    inert: bool,
}

/// Per-render collector implementing the two-phase
/// declare-then-finalize protocol.
///
/// Components call [`declare`](Self::declare) in render order; the host
/// calls [`finalize`](Self::finalize) exactly once, after every sibling
/// declaration has had its chance to run. All state is local to one
/// render, so concurrent page renders need no coordination.
pub struct PageCollector {
    declarations: Vec<Declaration>,
    head_anchor_visible: bool,
    placeholder_parents: HashMap<String, String>,
}

impl PageCollector {
    pub fn new() -> Self {
        Self {
            declarations: Vec::new(),
            head_anchor_visible: true,
            placeholder_parents: HashMap::new(),
        }
    }

    /// Hides the head anchor from merge searches (e.g. pages rendered
    /// without a managed head section).
    pub fn without_head_anchor(mut self) -> Self {
        self.head_anchor_visible = false;
        self
    }

    /// Registers one level of placeholder nesting: searches against
    /// `child` fall back to `parent` when the child holds no target.
    pub fn with_placeholder_parent(
        mut self,
        child: impl Into<String>,
        parent: impl Into<String>,
    ) -> Self {
        self.placeholder_parents.insert(child.into(), parent.into());
        self
    }

    /// Records a declaration and attempts to merge it into an earlier
    /// compatible one. Returns a handle usable with
    /// [`set_active`](Self::set_active).
    pub fn declare(&mut self, request: AssetRequest, location: Location) -> DeclarationId {
        let id = DeclarationId(self.declarations.len());
        let signature = request.signature();
        let group = request.keys.clone();

        let mut decl = Declaration {
            request,
            signature,
            location,
            active: true,
            group,
            inert: false,
        };

        // Only movable, mergeable declarations go looking for a target;
        // everything else stays put and waits for others to merge in.
        if decl.request.movable
            && decl.request.mergeable
            && let Some(target) = self.find_merge_target(&decl)
        {
            let keys = std::mem::take(&mut decl.group);
            self.declarations[target].group.extend(keys);
            decl.inert = true;
        }

        self.declarations.push(decl);
        id
    }

    /// Marks a declaration (in)visible. Inactive declarations are
    /// neither merge targets nor emitted.
    pub fn set_active(&mut self, id: DeclarationId, active: bool) {
        if let Some(decl) = self.declarations.get_mut(id.0) {
            decl.active = active;
        }
    }

    /// Merge search order: head anchor, own placeholder (with one level
    /// of parent fallback), then a full scan. First match wins.
    fn find_merge_target(&self, decl: &Declaration) -> Option<usize> {
        if self.head_anchor_visible
            && let Some(idx) = self.scan(decl, |d| d.location == Location::Head)
        {
            return Some(idx);
        }

        if let Location::Placeholder(name) = &decl.location {
            if let Some(idx) =
                self.scan(decl, |d| matches!(&d.location, Location::Placeholder(n) if n == name))
            {
                return Some(idx);
            }
            if let Some(parent) = self.placeholder_parents.get(name)
                && let Some(idx) = self.scan(
                    decl,
                    |d| matches!(&d.location, Location::Placeholder(n) if n == parent),
                )
            {
                return Some(idx);
            }
        }

        self.scan(decl, |_| true)
    }

    fn scan(&self, decl: &Declaration, in_scope: impl Fn(&Declaration) -> bool) -> Option<usize> {
        self.declarations.iter().position(|candidate| {
            in_scope(candidate)
                && candidate.request.kind == decl.request.kind
                && candidate.active
                && !candidate.inert
                && candidate.request.mergeable
                && candidate.signature == decl.signature
        })
    }

    /// Emits one tag per surviving owner. Must be called once, late,
    /// after all declarations.
    pub fn finalize(
        self,
        config: &Config,
        secure: bool,
    ) -> Result<Vec<EmittedTag>, AggregatorError> {
        let mut tags = Vec::new();

        for (idx, decl) in self.declarations.iter().enumerate() {
            if decl.inert || !decl.active {
                continue;
            }

            let kind = decl.request.kind;
            let ns = config
                .namespace(kind)
                .ok_or(AggregatorError::ConfigurationMissing(kind.as_str()))?;

            let sig = CanonicalSignature::from_keys(&decl.group, kind, ns.version);

            let cache_bust = if config.caching_enabled {
                None
            } else {
                Some(format!("nocache{}-", epoch_seconds()))
            };

            let location = if decl.request.movable {
                match &ns.handler_placeholder {
                    Some(name) => Location::Placeholder(name.clone()),
                    None => decl.location.clone(),
                }
            } else {
                decl.location.clone()
            };

            match codec::encode(ns, &sig, secure, cache_bust.as_deref()) {
                Ok(url) => {
                    tags.push(EmittedTag {
                        owner: DeclarationId(idx),
                        location,
                        html: render_tag(kind, &url, &decl.request),
                    });
                }
                // No bundling endpoint configured: one direct tag per
                // key, straight from configuration. No combining, no
                // caching. Configured keys may contain hyphens, so the
                // lookup uses the normalized key list rather than
                // re-splitting the joined signature.
                Err(CombinerError::ConfigurationMissing(_)) => {
                    let keys = combiner::types::normalize_keys(&decl.group);
                    let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
                    for value in combiner::resolver::ordered_values(ns, &keys) {
                        let url = codec::correct_scheme(value, secure);
                        tags.push(EmittedTag {
                            owner: DeclarationId(idx),
                            location: location.clone(),
                            html: render_tag(kind, &url, &decl.request),
                        });
                    }
                }
                Err(err) => {
                    // encode only fails on a missing template today;
                    // anything else still means an unusable deployment.
                    tracing::error!(kind = kind.as_str(), error = %err, "tag emission failed");
                    return Err(AggregatorError::ConfigurationMissing(kind.as_str()));
                }
            }
        }

        Ok(tags)
    }
}

impl Default for PageCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn render_tag(kind: AssetKind, url: &str, request: &AssetRequest) -> String {
    let attrs = request.render_attributes();
    match kind {
        AssetKind::Style => {
            format!("<link rel=\"stylesheet\" type=\"text/css\" href=\"{url}\"{attrs} />")
        }
        AssetKind::Script => {
            format!("<script type=\"text/javascript\" src=\"{url}\"{attrs}></script>")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use combiner::config::{Listener, Namespace};
    use std::collections::HashMap as Map;

    fn test_config(styles: Option<Namespace>, scripts: Option<Namespace>) -> Config {
        Config {
            listener: Listener {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            admin_listener: Listener {
                host: "127.0.0.1".to_string(),
                port: 3001,
            },
            asset_root: "/srv/assets".into(),
            caching_enabled: true,
            compression_enabled: true,
            styles,
            scripts,
        }
    }

    fn style_namespace() -> Namespace {
        Namespace {
            handler_path: Some("/bundles/{1}{0}.css".to_string()),
            ..Default::default()
        }
    }

    fn config_with_styles() -> Config {
        test_config(Some(style_namespace()), None)
    }

    fn style(keys: &[&str]) -> AssetRequest {
        AssetRequest::new(AssetKind::Style, keys.iter().copied())
    }

    #[test]
    fn test_duplicate_keys_collapse() {
        let mut collector = PageCollector::new();
        collector.declare(style(&["b", "a", "a"]), Location::Head);

        let tags = collector.finalize(&config_with_styles(), false).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(
            tags[0].html,
            "<link rel=\"stylesheet\" type=\"text/css\" href=\"/bundles/a-b.css\" />"
        );
    }

    #[test]
    fn test_compatible_declarations_merge_into_one_tag() {
        let mut collector = PageCollector::new();
        collector.declare(style(&["site"]), Location::Head);
        collector.declare(style(&["nav"]), Location::Inline);
        collector.declare(style(&["site"]), Location::Inline);

        let tags = collector.finalize(&config_with_styles(), false).unwrap();
        assert_eq!(tags.len(), 1);
        assert!(tags[0].html.contains("/bundles/nav-site.css"));
    }

    #[test]
    fn test_attribute_signature_separates_groups() {
        let mut collector = PageCollector::new();
        collector.declare(style(&["site"]), Location::Head);
        collector.declare(
            style(&["print"]).with_attribute("media", "print"),
            Location::Head,
        );

        let tags = collector.finalize(&config_with_styles(), false).unwrap();
        assert_eq!(tags.len(), 2);
        assert!(tags[0].html.contains("/bundles/site.css"));
        assert!(tags[1].html.contains("/bundles/print.css"));
        assert!(tags[1].html.contains(" media=\"print\""));
    }

    #[test]
    fn test_kinds_never_merge() {
        let ns_js = Namespace {
            handler_path: Some("/bundles/{1}{0}.js".to_string()),
            ..Default::default()
        };
        let config = test_config(Some(style_namespace()), Some(ns_js));

        let mut collector = PageCollector::new();
        collector.declare(style(&["site"]), Location::Head);
        collector.declare(
            AssetRequest::new(AssetKind::Script, ["site"]),
            Location::Head,
        );

        let tags = collector.finalize(&config, false).unwrap();
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn test_unmergeable_target_is_skipped() {
        let mut collector = PageCollector::new();
        collector.declare(style(&["site"]).not_mergeable(), Location::Head);
        collector.declare(style(&["nav"]), Location::Inline);

        let tags = collector.finalize(&config_with_styles(), false).unwrap();
        assert_eq!(tags.len(), 2);
        assert!(tags[0].html.contains("/bundles/site.css"));
        assert!(tags[1].html.contains("/bundles/nav.css"));
    }

    #[test]
    fn test_immovable_stays_put_but_accepts_merges() {
        let mut collector = PageCollector::new().without_head_anchor();
        collector.declare(style(&["site"]), Location::Head);
        // Never searches for a target despite the compatible
        // declaration above.
        let pinned = collector.declare(style(&["pinned"]).not_movable(), Location::Inline);
        // A later movable declaration merges into the first candidate
        // in declaration order, the one at the head.
        collector.declare(style(&["late"]), Location::Inline);

        let tags = collector.finalize(&config_with_styles(), false).unwrap();
        assert_eq!(tags.len(), 2);
        assert!(tags[0].html.contains("/bundles/late-site.css"));
        assert_eq!(tags[1].owner, pinned);
        assert_eq!(tags[1].location, Location::Inline);
        assert!(tags[1].html.contains("/bundles/pinned.css"));
    }

    #[test]
    fn test_head_anchor_preferred_over_declaration_order() {
        let mut collector = PageCollector::new();
        collector.declare(style(&["inline-first"]), Location::Inline);
        collector.declare(style(&["in-head"]), Location::Head);
        collector.declare(style(&["late"]), Location::Inline);

        // "late" merged into the head declaration, not the earlier
        // inline one.
        let tags = collector.finalize(&config_with_styles(), false).unwrap();
        assert_eq!(tags.len(), 2);
        assert!(tags[0].html.contains("/bundles/inline-first.css"));
        assert!(tags[1].html.contains("/bundles/in-head-late.css"));
    }

    #[test]
    fn test_placeholder_fallback_one_level() {
        let mut collector = PageCollector::new()
            .without_head_anchor()
            .with_placeholder_parent("sidebar", "main");
        collector.declare(style(&["first"]), Location::Inline);
        collector.declare(style(&["in-main"]), Location::Placeholder("main".to_string()));
        collector.declare(style(&["late"]), Location::Placeholder("sidebar".to_string()));

        // The parent placeholder wins over the earlier full-scan match.
        let tags = collector.finalize(&config_with_styles(), false).unwrap();
        assert_eq!(tags.len(), 2);
        assert!(tags[0].html.contains("/bundles/first.css"));
        assert!(tags[1].html.contains("/bundles/in-main-late.css"));
    }

    #[test]
    fn test_inactive_declarations_are_invisible() {
        let mut collector = PageCollector::new();
        let hidden = collector.declare(style(&["site"]), Location::Head);
        collector.set_active(hidden, false);
        collector.declare(style(&["nav"]), Location::Inline);

        let tags = collector.finalize(&config_with_styles(), false).unwrap();
        assert_eq!(tags.len(), 1);
        assert!(tags[0].html.contains("/bundles/nav.css"));
    }

    #[test]
    fn test_missing_namespace_is_fatal() {
        let mut collector = PageCollector::new();
        collector.declare(style(&["site"]), Location::Head);

        let config = test_config(None, None);
        assert!(matches!(
            collector.finalize(&config, false),
            Err(AggregatorError::ConfigurationMissing("style"))
        ));
    }

    #[test]
    fn test_fallback_to_direct_tags_without_handler_path() {
        let ns = Namespace {
            entries: Map::from([
                ("site".to_string(), "/css/site.css".to_string()),
                ("1_reset".to_string(), "/css/reset.css".to_string()),
            ]),
            ..Default::default()
        };
        let config = test_config(Some(ns), None);

        let mut collector = PageCollector::new();
        collector.declare(style(&["site", "reset"]), Location::Head);

        let tags = collector.finalize(&config, false).unwrap();
        // Priority tier 1 first, then the default tier.
        assert_eq!(tags.len(), 2);
        assert!(tags[0].html.contains("href=\"/css/reset.css\""));
        assert!(tags[1].html.contains("href=\"/css/site.css\""));
    }

    #[test]
    fn test_fallback_keeps_hyphenated_keys_whole() {
        let ns = Namespace {
            entries: Map::from([
                ("nav-bar".to_string(), "/css/nav-bar.css".to_string()),
                ("site".to_string(), "/css/site.css".to_string()),
            ]),
            ..Default::default()
        };
        let config = test_config(Some(ns), None);

        let mut collector = PageCollector::new();
        collector.declare(style(&["nav-bar", "site"]), Location::Head);

        let tags = collector.finalize(&config, false).unwrap();
        assert_eq!(tags.len(), 2);
        assert!(tags[0].html.contains("href=\"/css/nav-bar.css\""));
        assert!(tags[1].html.contains("href=\"/css/site.css\""));
    }

    #[test]
    fn test_fallback_corrects_insecure_schemes() {
        let ns = Namespace {
            entries: Map::from([(
                "vendor".to_string(),
                "http://example.org/a.css".to_string(),
            )]),
            ..Default::default()
        };
        let config = test_config(Some(ns), None);

        let mut collector = PageCollector::new();
        collector.declare(style(&["vendor"]), Location::Head);

        let tags = collector.finalize(&config, true).unwrap();
        assert!(tags[0].html.contains("href=\"https://example.org/a.css\""));
    }

    #[test]
    fn test_secure_handler_template_scheme_corrected() {
        let ns = Namespace {
            handler_path: Some("http://static.example.org/bundles/{1}{0}.css".to_string()),
            ..Default::default()
        };
        let config = test_config(Some(ns), None);

        let mut collector = PageCollector::new();
        collector.declare(style(&["site"]), Location::Head);

        let tags = collector.finalize(&config, true).unwrap();
        assert!(
            tags[0]
                .html
                .contains("https://static.example.org/bundles/site.css")
        );
    }

    #[test]
    fn test_cache_bust_token_when_caching_disabled() {
        let mut config = config_with_styles();
        config.caching_enabled = false;

        let mut collector = PageCollector::new();
        collector.declare(style(&["site"]), Location::Head);

        let tags = collector.finalize(&config, false).unwrap();
        assert!(tags[0].html.contains("/bundles/nocache"));

        // The emitted URL still decodes to the same keys.
        let href = tags[0]
            .html
            .split("href=\"")
            .nth(1)
            .unwrap()
            .split('"')
            .next()
            .unwrap();
        let decoded = codec::decode(href).unwrap();
        assert_eq!(decoded.keys, "site");
        assert!(decoded.cache_bust);
    }

    #[test]
    fn test_version_appended_from_namespace() {
        let ns = Namespace {
            handler_path: Some("/bundles/{1}{0}.css".to_string()),
            version: Some(2),
            ..Default::default()
        };
        let config = test_config(Some(ns), None);

        let mut collector = PageCollector::new();
        collector.declare(style(&["beta", "alpha"]), Location::Head);

        let tags = collector.finalize(&config, false).unwrap();
        assert!(tags[0].html.contains("/bundles/alpha-beta-v2.css"));

        let decoded = codec::decode("/bundles/alpha-beta-v2.css").unwrap();
        assert_eq!(decoded.cache_key(), "alpha-betaCSS-v2");
    }

    #[test]
    fn test_handler_placeholder_overrides_destination() {
        let ns = Namespace {
            handler_path: Some("/bundles/{1}{0}.css".to_string()),
            handler_placeholder: Some("assets".to_string()),
            ..Default::default()
        };
        let config = test_config(Some(ns), None);

        let mut collector = PageCollector::new();
        collector.declare(style(&["site"]), Location::Inline);

        let tags = collector.finalize(&config, false).unwrap();
        assert_eq!(tags[0].location, Location::Placeholder("assets".to_string()));
    }
}
