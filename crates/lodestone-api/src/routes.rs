//! Explicit route table: the original site assembled its endpoint tree with
//! runtime decorator introspection; here every endpoint is a typed
//! descriptor (path segments, required access, expected extension, handler)
//! registered at startup.

use crate::{handlers, ApiContext};
use lodestone_common::{LodestoneError, Result};
use log::debug;
use serde_json::Value;
use std::collections::HashMap;

/// Content negotiation by trailing path extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    Json,
    Dat,
    Mca,
    Png,
}

impl Extension {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "json" => Some(Extension::Json),
            "dat" => Some(Extension::Dat),
            "mca" => Some(Extension::Mca),
            "png" => Some(Extension::Png),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Extension::Json => "json",
            Extension::Dat => "dat",
            Extension::Mca => "mca",
            Extension::Png => "png",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    MemberOnly,
}

/// What a handler produces; the HTTP collaborator turns this into a
/// response body.
#[derive(Debug, PartialEq)]
pub enum Response {
    Json(Value),
    Binary {
        content_type: &'static str,
        body: Vec<u8>,
    },
}

/// Captured path parameters, by the name given in the route pattern.
pub struct Params<'a> {
    values: HashMap<&'static str, &'a str>,
    pub extension: Extension,
}

impl<'a> Params<'a> {
    pub fn str(&self, name: &'static str) -> Result<&'a str> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| LodestoneError::NotFound(format!("missing parameter {}", name)))
    }

    /// Integer parameter; a non-numeric value means the URL names nothing.
    pub fn int(&self, name: &'static str) -> Result<i32> {
        let raw = self.str(name)?;
        raw.parse()
            .map_err(|_| LodestoneError::NotFound(format!("{} is not an integer: {}", name, raw)))
    }
}

pub type Handler = fn(&ApiContext, &Params) -> Result<Response>;

#[derive(Debug, Clone, Copy)]
enum Seg {
    Literal(&'static str),
    Param(&'static str),
}

struct Route {
    segments: Vec<Seg>,
    extension: Extension,
    access: Access,
    handler: Handler,
}

/// The endpoint tree, built once at startup.
pub struct ApiTree {
    routes: Vec<Route>,
}

impl ApiTree {
    pub fn new() -> Self {
        let mut tree = ApiTree { routes: Vec::new() };
        tree.route(
            "world/:world/dim/:dimension/chunk/:x/:y/:z",
            Extension::Json,
            Access::Public,
            handlers::chunk_blocks,
        );
        tree.route(
            "world/:world/dim/:dimension/region/:rx/:rz",
            Extension::Mca,
            Access::Public,
            handlers::region_raw,
        );
        tree.route(
            "world/:world/level",
            Extension::Json,
            Access::Public,
            handlers::level_data,
        );
        tree.route(
            "world/:world/level",
            Extension::Dat,
            Access::Public,
            handlers::level_data,
        );
        tree.route(
            "world/:world/player/:player/playerdata",
            Extension::Json,
            Access::MemberOnly,
            handlers::player_data,
        );
        tree.route(
            "world/:world/player/:player/playerdata",
            Extension::Dat,
            Access::MemberOnly,
            handlers::player_data,
        );
        tree.route(
            "world/:world/player/:player/stats",
            Extension::Json,
            Access::MemberOnly,
            handlers::player_stats,
        );
        tree
    }

    fn route(&mut self, pattern: &'static str, extension: Extension, access: Access, handler: Handler) {
        let segments = pattern
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => Seg::Param(name),
                None => Seg::Literal(segment),
            })
            .collect();
        self.routes.push(Route {
            segments,
            extension,
            access,
            handler,
        });
    }

    /// Resolves and runs the handler for a request path like
    /// `world/wurstmineberg/dim/overworld/chunk/0/4/0.json`.
    ///
    /// `identity` is whatever credential the caller presented; membership is
    /// decided by the directory capability.
    pub fn dispatch(
        &self,
        context: &ApiContext,
        path: &str,
        identity: Option<&str>,
    ) -> Result<Response> {
        let path = path.trim_matches('/');
        let mut segments: Vec<&str> = path.split('/').collect();
        let last = segments.pop().ok_or_else(|| {
            LodestoneError::NotFound("empty request path".to_owned())
        })?;
        let (stem, extension) = match last.rsplit_once('.') {
            Some((stem, suffix)) => (stem, Extension::from_suffix(suffix)),
            None => (last, None),
        };
        segments.push(stem);

        let mut expected: Option<Extension> = None;
        for route in &self.routes {
            let Some(params) = match_segments(&route.segments, &segments) else {
                continue;
            };
            if extension != Some(route.extension) {
                // Right resource, wrong representation; remember what it
                // actually serves for the error.
                expected.get_or_insert(route.extension);
                continue;
            }
            if route.access == Access::MemberOnly
                && !identity.is_some_and(|id| context.directory.is_member(id))
            {
                return Err(LodestoneError::Unauthorized);
            }
            debug!("dispatching {} as .{}", path, route.extension.as_str());
            let params = Params {
                values: params,
                extension: route.extension,
            };
            return (route.handler)(context, &params);
        }

        match expected {
            Some(expected) => Err(LodestoneError::WrongExtension {
                requested: last.rsplit_once('.').map_or_else(
                    || "(none)".to_owned(),
                    |(_, suffix)| suffix.to_owned(),
                ),
                expected: expected.as_str().to_owned(),
            }),
            None => Err(LodestoneError::NotFound(format!("no endpoint for {}", path))),
        }
    }
}

impl Default for ApiTree {
    fn default() -> Self {
        ApiTree::new()
    }
}

fn match_segments<'a>(
    pattern: &[Seg],
    segments: &[&'a str],
) -> Option<HashMap<&'static str, &'a str>> {
    if pattern.len() != segments.len() {
        return None;
    }
    let mut params = HashMap::new();
    for (seg, &value) in pattern.iter().zip(segments) {
        match seg {
            Seg::Literal(literal) => {
                if *literal != value {
                    return None;
                }
            }
            Seg::Param(name) => {
                params.insert(*name, value);
            }
        }
    }
    Some(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AssetTables, StaticDirectory};
    use assert_matches::assert_matches;
    use std::path::PathBuf;

    fn context() -> ApiContext {
        ApiContext {
            directory: Box::new(StaticDirectory::new(
                PathBuf::from("/nonexistent"),
                vec!["member1".to_owned()],
                Default::default(),
            )),
            tables: AssetTables::empty(),
        }
    }

    #[test]
    fn test_unknown_path_is_not_found() {
        let tree = ApiTree::new();
        assert_matches!(
            tree.dispatch(&context(), "nope/nothing.json", None),
            Err(LodestoneError::NotFound(_))
        );
    }

    #[test]
    fn test_wrong_extension_reports_expected() {
        let tree = ApiTree::new();
        let err = tree
            .dispatch(&context(), "world/w/dim/overworld/chunk/0/4/0.dat", None)
            .unwrap_err();
        assert_matches!(
            err,
            LodestoneError::WrongExtension { requested, expected }
                if requested == "dat" && expected == "json"
        );
    }

    #[test]
    fn test_missing_extension_is_wrong_extension() {
        let tree = ApiTree::new();
        assert_matches!(
            tree.dispatch(&context(), "world/w/dim/overworld/chunk/0/4/0", None),
            Err(LodestoneError::WrongExtension { .. })
        );
    }

    #[test]
    fn test_png_is_recognized_but_unserved() {
        // Player heads belong to the image collaborator; nothing here serves
        // .png, so the negotiator parses it and reports the real extension.
        let tree = ApiTree::new();
        assert_matches!(
            tree.dispatch(&context(), "world/w/level.png", None),
            Err(LodestoneError::WrongExtension { .. })
        );
    }

    #[test]
    fn test_member_only_without_identity() {
        let tree = ApiTree::new();
        assert_matches!(
            tree.dispatch(&context(), "world/w/player/p/playerdata.json", None),
            Err(LodestoneError::Unauthorized)
        );
    }

    #[test]
    fn test_member_only_with_non_member_identity() {
        let tree = ApiTree::new();
        assert_matches!(
            tree.dispatch(
                &context(),
                "world/w/player/p/playerdata.json",
                Some("stranger")
            ),
            Err(LodestoneError::Unauthorized)
        );
    }

    #[test]
    fn test_member_passes_gate_and_reaches_handler() {
        // The world does not exist, so the handler itself reports not-found;
        // reaching it proves the gate opened.
        let tree = ApiTree::new();
        assert_matches!(
            tree.dispatch(
                &context(),
                "world/w/player/p/playerdata.json",
                Some("member1")
            ),
            Err(LodestoneError::NotFound(_))
        );
    }

    #[test]
    fn test_non_integer_chunk_coordinate() {
        let tree = ApiTree::new();
        assert_matches!(
            tree.dispatch(&context(), "world/w/dim/overworld/chunk/0/four/0.json", None),
            Err(LodestoneError::NotFound(_))
        );
    }
}
