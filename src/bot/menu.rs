use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuPage {
    pub content: Option<String>,
    pub embed: Option<MenuEmbed>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuEmbed {
    pub description: Option<String>,
    pub fields: Vec<MenuField>,
    pub footer: Option<String>,
    pub color: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuField {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEndAction {
    DisableButtons,
    RemoveButtons,
    LeaveAsIs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum MenuStep {
    Goto(usize),
    Stop,
    NotOwner,
    Ignore,
}

/// Parse a navigation custom-id. `page-N` ids are 1-based on the wire.
fn parse_custom_id(custom_id: &str, current: usize) -> Option<MenuStep> {
    match custom_id {
        "previous" => Some(MenuStep::Goto(current.checked_sub(1)?)),
        "next" => Some(MenuStep::Goto(current + 1)),
        "stop" => Some(MenuStep::Stop),
        other => {
            let page = other.strip_prefix("page-")?.parse::<usize>().ok()?;
            Some(MenuStep::Goto(page.checked_sub(1)?))
        }
    }
}

/// One paginated message with button controls. Created by a command, owned
/// by the [`MenuRegistry`], released on stop or idle timeout.
pub struct ButtonMenu {
    pages: Vec<MenuPage>,
    page: usize,
    owner_id: String,
    channel_id: String,
    end_action: MenuEndAction,
    idle_timeout: Duration,
    deadline: Instant,
}

impl ButtonMenu {
    pub fn new(
        pages: Vec<MenuPage>,
        owner_id: &str,
        channel_id: &str,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            pages,
            page: 0,
            owner_id: owner_id.to_string(),
            channel_id: channel_id.to_string(),
            end_action: MenuEndAction::DisableButtons,
            idle_timeout,
            deadline: Instant::now() + idle_timeout,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn end_action(&self) -> MenuEndAction {
        self.end_action
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.pages.len()
    }

    pub fn expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    fn touch(&mut self, now: Instant) {
        self.deadline = now + self.idle_timeout;
    }

    fn step(&self, custom_id: &str, user_id: &str) -> MenuStep {
        if user_id != self.owner_id {
            return MenuStep::NotOwner;
        }
        parse_custom_id(custom_id, self.page).unwrap_or(MenuStep::Ignore)
    }
}

/// What the event layer should do after a button press was routed.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuReaction {
    /// Edit the menu message to this page.
    Show {
        page: MenuPage,
        page_index: usize,
        page_count: usize,
    },
    /// Tell the clicking user the menu is not theirs.
    RejectForeignUser,
    /// The menu ended; apply the end action and forget it.
    Finish { end_action: MenuEndAction },
    /// Acknowledge without changing anything.
    Acknowledge,
}

/// All live menus, keyed by the id of the message carrying the buttons.
/// Exactly one handler per menu: every press goes through `handle`.
#[derive(Default)]
pub struct MenuRegistry {
    menus: Mutex<HashMap<String, ButtonMenu>>,
}

impl MenuRegistry {
    pub fn insert(&self, message_id: &str, menu: ButtonMenu) {
        self.menus.lock().insert(message_id.to_string(), menu);
    }

    pub fn len(&self) -> usize {
        self.menus.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.menus.lock().is_empty()
    }

    pub fn clear(&self) {
        self.menus.lock().clear();
    }

    /// Stop a menu explicitly, returning its end action if it was live.
    pub fn stop(&self, message_id: &str) -> Option<(String, MenuEndAction)> {
        self.menus
            .lock()
            .remove(message_id)
            .map(|menu| (menu.channel_id.clone(), menu.end_action))
    }

    pub fn handle(
        &self,
        message_id: &str,
        custom_id: &str,
        user_id: &str,
    ) -> Option<MenuReaction> {
        self.handle_at(message_id, custom_id, user_id, Instant::now())
    }

    pub(crate) fn handle_at(
        &self,
        message_id: &str,
        custom_id: &str,
        user_id: &str,
        now: Instant,
    ) -> Option<MenuReaction> {
        let mut menus = self.menus.lock();
        let step = menus.get(message_id)?.step(custom_id, user_id);

        match step {
            MenuStep::NotOwner => Some(MenuReaction::RejectForeignUser),
            MenuStep::Ignore => Some(MenuReaction::Acknowledge),
            MenuStep::Stop => {
                let menu = menus.remove(message_id)?;
                Some(MenuReaction::Finish {
                    end_action: menu.end_action,
                })
            }
            MenuStep::Goto(target) => {
                let menu = menus.get_mut(message_id)?;
                menu.touch(now);
                if target < menu.pages.len() && target != menu.page {
                    menu.page = target;
                    Some(MenuReaction::Show {
                        page: menu.pages[target].clone(),
                        page_index: target,
                        page_count: menu.pages.len(),
                    })
                } else {
                    Some(MenuReaction::Acknowledge)
                }
            }
        }
    }

    /// Remove every menu past its idle deadline, returning what is needed to
    /// neutralize the controls on each orphaned message.
    pub fn sweep_expired(&self, now: Instant) -> Vec<(String, String, MenuEndAction)> {
        let mut menus = self.menus.lock();
        let expired: Vec<String> = menus
            .iter()
            .filter(|(_, menu)| menu.expired(now))
            .map(|(id, _)| id.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|id| {
                menus
                    .remove(&id)
                    .map(|menu| (id, menu.channel_id.clone(), menu.end_action))
            })
            .collect()
    }
}
