//! Group administration over `w:g2` IQ queries: announcement setting,
//! admin lookup, and participant removal.

use super::events::bare_jid;
use super::WhatsAppChannel;
use tracing::{info, warn};
use wacore_binary::builder::NodeBuilder;
use wacore_binary::jid::Jid;
use wacore_binary::node::NodeContent;
use warden_core::error::WardenError;
use whatsapp_rust::request::{InfoQuery, InfoQueryType};

/// Tag of the `w:g2` setting node: `announcement` locks the group to admins.
pub(super) fn announce_tag(announce: bool) -> &'static str {
    if announce {
        "announcement"
    } else {
        "not_announcement"
    }
}

/// Whether a participant `type` attribute marks a group admin.
pub(super) fn is_admin_type(kind: Option<&str>) -> bool {
    matches!(kind, Some("admin") | Some("superadmin"))
}

fn parse_jid(jid_str: &str) -> Result<Jid, WardenError> {
    jid_str
        .parse()
        .map_err(|e| WardenError::Channel(format!("invalid whatsapp JID '{jid_str}': {e}")))
}

impl WhatsAppChannel {
    pub(super) async fn set_announce_impl(
        &self,
        group_id: &str,
        announce: bool,
    ) -> Result<(), WardenError> {
        let client = self.connected_client().await?;
        let group_jid = parse_jid(group_id)?;

        let setting_node = NodeBuilder::new(announce_tag(announce)).build();
        let iq = InfoQuery {
            namespace: "w:g2",
            query_type: InfoQueryType::Set,
            to: group_jid,
            content: Some(NodeContent::Nodes(vec![setting_node])),
            id: None,
            target: None,
            timeout: None,
        };
        client.send_iq(iq).await.map_err(|e| {
            WardenError::Channel(format!("failed to update settings of {group_id}: {e}"))
        })?;

        info!(
            "group {group_id} is now {}",
            if announce { "admin-only" } else { "open" }
        );
        Ok(())
    }

    pub(super) async fn group_admins_impl(
        &self,
        group_id: &str,
    ) -> Result<Vec<String>, WardenError> {
        let client = self.connected_client().await?;
        let group_jid = parse_jid(group_id)?;

        let query_node = NodeBuilder::new("query")
            .attr("request", "interactive")
            .build();
        let iq = InfoQuery {
            namespace: "w:g2",
            query_type: InfoQueryType::Get,
            to: group_jid,
            content: Some(NodeContent::Nodes(vec![query_node])),
            id: None,
            target: None,
            timeout: None,
        };
        let resp_node = client.send_iq(iq).await.map_err(|e| {
            WardenError::Channel(format!("failed to fetch metadata of {group_id}: {e}"))
        })?;

        let group_node = resp_node.get_optional_child("group").ok_or_else(|| {
            WardenError::Channel("<group> not found in group info response".into())
        })?;

        let admins = group_node
            .get_children_by_tag("participant")
            .into_iter()
            .filter_map(|participant| {
                let mut parser = wacore_binary::attrs::AttrParser::new(participant);
                let kind = parser.optional_string("type").map(str::to_string);
                let jid = parser.jid("jid");
                is_admin_type(kind.as_deref()).then(|| bare_jid(&jid))
            })
            .collect();
        Ok(admins)
    }

    pub(super) async fn remove_participant_impl(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<(), WardenError> {
        let client = self.connected_client().await?;
        let group_jid = parse_jid(group_id)?;
        let user_jid = parse_jid(user_id)?;

        let remove_node = NodeBuilder::new("remove")
            .children(vec![NodeBuilder::new("participant")
                .attr("jid", user_jid.to_string())
                .build()])
            .build();
        let iq = InfoQuery {
            namespace: "w:g2",
            query_type: InfoQueryType::Set,
            to: group_jid,
            content: Some(NodeContent::Nodes(vec![remove_node])),
            id: None,
            target: None,
            timeout: None,
        };
        let resp_node = client
            .send_iq(iq)
            .await
            .map_err(|e| WardenError::Channel(format!("failed to remove {user_id}: {e}")))?;

        if let Some(remove_response) = resp_node.get_optional_child("remove") {
            for participant in remove_response.get_children_by_tag("participant") {
                let mut parser = wacore_binary::attrs::AttrParser::new(participant);
                if let Some(code) = parser.optional_u64("error") {
                    warn!("failed to remove {user_id} from {group_id}: error code {code}");
                    return Err(WardenError::Channel(format!(
                        "whatsapp refused to remove {user_id} (error {code})"
                    )));
                }
            }
        }

        info!("removed {user_id} from {group_id}");
        Ok(())
    }
}
