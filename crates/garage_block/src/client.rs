//! Client-side message intake.
//!
//! The server owns every list and setting; the client applies published
//! updates to its local block mirrors and surfaces rejections to the
//! player. Nothing here mutates authoritative state.

use crate::block::{BlockAction, GarageBlock};
use ahash::AHashMap;
use garage_core::{EntityId, GarageConfig};
use garage_protocol::Message;

#[derive(Default)]
pub struct ClientSession {
    config: GarageConfig,
    blocks: AHashMap<EntityId, GarageBlock>,
}

impl ClientSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Server settings as last pushed, defaults until then.
    pub fn config(&self) -> &GarageConfig {
        &self.config
    }

    pub fn register_block(&mut self, block: GarageBlock) {
        self.blocks.insert(block.entity, block);
    }

    pub fn unregister_block(&mut self, entity: EntityId) -> Option<GarageBlock> {
        self.blocks.remove(&entity)
    }

    pub fn block(&self, entity: EntityId) -> Option<&GarageBlock> {
        self.blocks.get(&entity)
    }

    pub fn block_mut(&mut self, entity: EntityId) -> Option<&mut GarageBlock> {
        self.blocks.get_mut(&entity)
    }

    /// Apply one server message, returning actions for the embedding.
    pub fn apply_message(&mut self, message: Message) -> Vec<BlockAction> {
        match message {
            Message::GridListUpdate { garage, update } => {
                match self.blocks.get_mut(&garage) {
                    Some(block) => {
                        block.apply_names_update(update);
                    }
                    None => tracing::debug!(%garage, "list update for unknown block"),
                }
                Vec::new()
            }
            Message::PreviewReply {
                garage,
                name,
                prefab,
            } => match self.blocks.get_mut(&garage) {
                Some(block) => block.preview_payload(&name, prefab),
                None => Vec::new(),
            },
            Message::Settings(config) => {
                tracing::info!("received garage settings from server");
                self.config = config;
                Vec::new()
            }
            Message::Reject { garage, reason } => {
                tracing::debug!(%garage, "command rejected: {}", reason);
                vec![BlockAction::Notify {
                    text: reason,
                    warning: true,
                }]
            }
            other => {
                tracing::warn!(?other, "client received non-reply message");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garage_core::{StorageScope, SyncUpdate};

    fn mirror(entity: EntityId) -> GarageBlock {
        GarageBlock::with_scope(entity, EntityId(2), StorageScope::fresh())
    }

    #[test]
    fn test_list_update_reaches_the_block() {
        let mut client = ClientSession::new();
        client.register_block(mirror(EntityId(1)));

        client.apply_message(Message::GridListUpdate {
            garage: EntityId(1),
            update: SyncUpdate {
                value: vec!["Freighter".to_string()],
                version: 1,
            },
        });
        let block = client.block(EntityId(1)).unwrap();
        assert_eq!(block.grid_names(), ["Freighter".to_string()]);
    }

    #[test]
    fn test_stale_list_update_is_ignored() {
        let mut client = ClientSession::new();
        client.register_block(mirror(EntityId(1)));

        client.apply_message(Message::GridListUpdate {
            garage: EntityId(1),
            update: SyncUpdate {
                value: vec!["Newer".to_string()],
                version: 5,
            },
        });
        client.apply_message(Message::GridListUpdate {
            garage: EntityId(1),
            update: SyncUpdate {
                value: vec!["Older".to_string()],
                version: 3,
            },
        });
        assert_eq!(
            client.block(EntityId(1)).unwrap().grid_names(),
            ["Newer".to_string()]
        );
    }

    #[test]
    fn test_rejection_surfaces_as_warning() {
        let mut client = ClientSession::new();
        let actions = client.apply_message(Message::Reject {
            garage: EntityId(1),
            reason: "Storage cooldown: 12s remaining".into(),
        });
        assert_eq!(
            actions,
            vec![BlockAction::Notify {
                text: "Storage cooldown: 12s remaining".into(),
                warning: true,
            }]
        );
    }

    #[test]
    fn test_settings_replace_defaults() {
        let mut client = ClientSession::new();
        let mut config = GarageConfig::default();
        config.max_stored_grid_count = 3;
        client.apply_message(Message::Settings(config.clone()));
        assert_eq!(client.config().max_stored_grid_count, 3);
    }
}
