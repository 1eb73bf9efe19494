use std::collections::HashMap;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use teloxide::prelude::*;
use teloxide::types::{ChatMemberKind, UserId};
use tracing::warn;

use crate::config::CONFIG;

static SEARCH_COOLDOWNS: Lazy<Mutex<HashMap<i64, Instant>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipGate {
    Allowed,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipLookup {
    Present,
    NotParticipant,
    Failed,
}

pub fn classify_member_kind(kind: &ChatMemberKind) -> MembershipLookup {
    if kind.is_left() || kind.is_banned() {
        MembershipLookup::NotParticipant
    } else {
        MembershipLookup::Present
    }
}

/// Denied only on a definite "not a participant" answer. A failed lookup
/// (network error, bot lacks access, misconfigured channel id) resolves per
/// the configured policy; the default is fail-open so an unreliable check
/// never locks legitimate users out.
pub fn gate_from_lookup(lookup: MembershipLookup, fail_open: bool) -> MembershipGate {
    match lookup {
        MembershipLookup::Present => MembershipGate::Allowed,
        MembershipLookup::NotParticipant => MembershipGate::Denied,
        MembershipLookup::Failed => {
            if fail_open {
                MembershipGate::Allowed
            } else {
                MembershipGate::Denied
            }
        }
    }
}

/// Fresh point check on every delivery request; membership is never cached.
pub async fn check_membership(bot: &Bot, user_id: UserId) -> MembershipGate {
    let lookup = match bot
        .get_chat_member(ChatId(CONFIG.fsub_channel_id), user_id)
        .await
    {
        Ok(member) => classify_member_kind(&member.kind),
        Err(err) => {
            warn!("Membership lookup failed for user {user_id}: {err}");
            MembershipLookup::Failed
        }
    };
    gate_from_lookup(lookup, CONFIG.fsub_fail_open)
}

pub async fn check_admin_access(bot: &Bot, message: &Message) -> bool {
    let user_id = message
        .from
        .as_ref()
        .and_then(|user| i64::try_from(user.id.0).ok())
        .unwrap_or_default();

    if CONFIG.is_admin(user_id) {
        return true;
    }

    let _ = bot
        .send_message(
            message.chat.id,
            "You are not authorized to use this command.",
        )
        .await;
    false
}

pub fn is_on_search_cooldown(user_id: i64) -> bool {
    check_cooldown(
        &SEARCH_COOLDOWNS,
        user_id,
        Duration::from_secs(CONFIG.search_cooldown_seconds),
    )
}

fn check_cooldown(map: &Mutex<HashMap<i64, Instant>>, user_id: i64, window: Duration) -> bool {
    if window.is_zero() {
        return false;
    }

    let mut limits = map.lock();
    let now = Instant::now();

    if let Some(last) = limits.get(&user_id) {
        if now.duration_since(*last) < window {
            return true;
        }
    }

    limits.insert(user_id, now);
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definite_non_participant_is_denied() {
        assert_eq!(
            gate_from_lookup(MembershipLookup::NotParticipant, true),
            MembershipGate::Denied
        );
        assert_eq!(
            gate_from_lookup(MembershipLookup::NotParticipant, false),
            MembershipGate::Denied
        );
    }

    #[test]
    fn lookup_failure_follows_the_configured_policy() {
        assert_eq!(
            gate_from_lookup(MembershipLookup::Failed, true),
            MembershipGate::Allowed
        );
        assert_eq!(
            gate_from_lookup(MembershipLookup::Failed, false),
            MembershipGate::Denied
        );
    }

    #[test]
    fn present_members_are_always_allowed() {
        assert_eq!(
            gate_from_lookup(MembershipLookup::Present, false),
            MembershipGate::Allowed
        );
    }

    #[test]
    fn cooldown_blocks_repeat_requests_within_the_window() {
        let map = Mutex::new(HashMap::new());
        assert!(!check_cooldown(&map, 7, Duration::from_secs(10)));
        assert!(check_cooldown(&map, 7, Duration::from_secs(10)));
        assert!(!check_cooldown(&map, 8, Duration::from_secs(10)));
    }

    #[test]
    fn zero_window_disables_the_cooldown() {
        let map = Mutex::new(HashMap::new());
        assert!(!check_cooldown(&map, 7, Duration::ZERO));
        assert!(!check_cooldown(&map, 7, Duration::ZERO));
    }
}
