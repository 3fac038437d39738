use crate::app_error::{AppError, AppResult};
use crate::types::{ListId, VaultId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Tag routes are an ordered sequence: the first route whose tag matches a
/// tag on the task (in the order tags appeared on the line) wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagRouteV1 {
    pub vault_id: String,
    pub tag: String,
    pub list_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListRouteV1 {
    pub list_id: String,
    pub target_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VaultMappingV1 {
    pub vault_id: String,
    pub default_list_id: String,
}

fn route_error(code: &str, message: &str, details: serde_json::Value) -> AppError {
    AppError::new(code, "routes", message, false, details)
}

fn tag_key(tag: &str) -> &str {
    tag.trim_start_matches('#')
}

pub fn default_list_for_vault<'a>(
    vault_id: &VaultId,
    mappings: &'a [VaultMappingV1],
) -> Option<&'a str> {
    mappings
        .iter()
        .find(|mapping| mapping.vault_id == vault_id.0)
        .map(|mapping| mapping.default_list_id.as_str())
}

/// Destination list for an Obsidian-originated create. Routes are
/// consulted before the vault default; a route that points at a list the
/// configuration does not know is a configuration error at first use.
pub fn route_obs_create(
    vault_id: &VaultId,
    task_tags: &[String],
    tag_routes: &[TagRouteV1],
    mappings: &[VaultMappingV1],
    known_lists: &BTreeSet<String>,
) -> AppResult<ListId> {
    for tag in task_tags {
        for route in tag_routes.iter().filter(|r| r.vault_id == vault_id.0) {
            if tag_key(tag) == tag_key(&route.tag) {
                if !known_lists.contains(&route.list_id) {
                    return Err(route_error(
                        "TB_ROUTE_LIST_UNKNOWN",
                        "tag route points at a list that is not configured",
                        serde_json::json!({
                            "vault_id": vault_id.0,
                            "tag": route.tag,
                            "list_id": route.list_id
                        }),
                    ));
                }
                return Ok(ListId(route.list_id.clone()));
            }
        }
    }
    match default_list_for_vault(vault_id, mappings) {
        Some(list_id) => Ok(ListId(list_id.to_string())),
        None => Err(route_error(
            "TB_ROUTE_UNRESOLVED",
            "no tag route matched and the vault has no default list",
            serde_json::json!({ "vault_id": vault_id.0, "tags": task_tags }),
        )),
    }
}

/// Destination file for a Reminders-originated create: list route if one
/// exists for the source list, else the vault inbox.
pub fn route_rem_create(
    list_id: &ListId,
    list_routes: &[ListRouteV1],
    inbox_file: &str,
) -> (String, Option<String>) {
    for route in list_routes {
        if route.list_id == list_id.0 {
            return (route.target_file.clone(), route.heading.clone());
        }
    }
    (inbox_file.to_string(), None)
}

/// The set of lists a sync run must query: the vault default plus every
/// list referenced by one of the vault's tag routes, order preserved.
/// Missing a routed list makes tasks created into it on the previous run
/// look deleted.
pub fn expand_query_lists(
    vault_id: &VaultId,
    mappings: &[VaultMappingV1],
    tag_routes: &[TagRouteV1],
) -> Vec<ListId> {
    let mut seen = BTreeSet::new();
    let mut lists = Vec::new();
    if let Some(default_list) = default_list_for_vault(vault_id, mappings) {
        if seen.insert(default_list.to_string()) {
            lists.push(ListId(default_list.to_string()));
        }
    }
    for route in tag_routes.iter().filter(|r| r.vault_id == vault_id.0) {
        if seen.insert(route.list_id.clone()) {
            lists.push(ListId(route.list_id.clone()));
        }
    }
    lists
}
