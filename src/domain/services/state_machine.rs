use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::domain::entities::{
    sanitize_attributes, sanitize_referer, Contact, Conversation, ConversationStatus,
    CreateConversation, Inbox, Message, Priority,
};
use crate::domain::events::{
    ChangedAttributes, ConversationEventData, ConversationField, DomainEvent, EventName,
    EventPayload, TrackedSnapshot,
};

/// Who is performing a transition and when.
#[derive(Debug, Clone)]
pub struct TransitionContext {
    pub performed_by: Option<String>,
    pub now: DateTime<Utc>,
}

impl TransitionContext {
    pub fn system(now: DateTime<Utc>) -> Self {
        Self {
            performed_by: None,
            now,
        }
    }

    pub fn by(actor: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            performed_by: Some(actor.into()),
            now,
        }
    }
}

/// Status a brand new conversation starts in.
pub fn initial_status(inbox: &Inbox, contact: &Contact, from_campaign: bool) -> ConversationStatus {
    if contact.blocked {
        return ConversationStatus::Resolved;
    }
    // Campaign conversations skip the bot so agents can see them
    if from_campaign {
        return ConversationStatus::Open;
    }
    if inbox.active_bot {
        return ConversationStatus::Pending;
    }
    ConversationStatus::Open
}

/// Build a conversation from a create request. `display_id` stays empty until
/// the record store has inserted it.
pub fn build_conversation(
    id: String,
    request: CreateConversation,
    inbox: &Inbox,
    contact: &Contact,
    now: DateTime<Utc>,
) -> Conversation {
    let status = initial_status(inbox, contact, request.campaign_id.is_some());
    let mut additional_attributes = sanitize_attributes(request.additional_attributes);
    sanitize_referer(&mut additional_attributes);

    Conversation {
        id,
        display_id: None,
        account_id: request.account_id,
        inbox_id: request.inbox_id,
        contact_id: request.contact_id,
        status,
        waiting_since: Some(now),
        first_reply_created_at: None,
        snoozed_until: None,
        assignee_id: request.assignee_id,
        team_id: request.team_id,
        priority: None,
        labels: Vec::new(),
        custom_attributes: request.custom_attributes,
        additional_attributes,
        campaign_id: request.campaign_id,
        conversation_type: request.conversation_type,
        contact_last_seen_at: None,
        agent_last_seen_at: None,
        messages: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

pub fn creation_events(conversation: &Conversation, ctx: &TransitionContext) -> Vec<DomainEvent> {
    vec![DomainEvent::new(
        EventName::ConversationCreated,
        ctx.now,
        EventPayload::Conversation(ConversationEventData {
            conversation: conversation.clone(),
            notifiable_assignee_change: conversation.assignee_id.is_some()
                && conversation.assignee_id != ctx.performed_by,
            changed_attributes: None,
            performed_by: ctx.performed_by.clone(),
        }),
    )]
}

/// Run `mutate`, normalise the result and derive the events for whatever
/// tracked fields changed.
///
/// Nothing here persists or dispatches; callers save the conversation
/// before dispatching the returned events.
pub fn apply<F>(
    conversation: &mut Conversation,
    ctx: &TransitionContext,
    mutate: F,
) -> Vec<DomainEvent>
where
    F: FnOnce(&mut Conversation),
{
    let before = TrackedSnapshot::capture(conversation);
    let previous_status = conversation.status;

    mutate(conversation);

    if conversation.status != ConversationStatus::Snoozed {
        conversation.snoozed_until = None;
    }
    if conversation.status == ConversationStatus::Resolved
        && previous_status != ConversationStatus::Resolved
    {
        conversation.waiting_since = None;
    }
    sanitize_referer(&mut conversation.additional_attributes);

    let changes = ChangedAttributes::between(&before, conversation);
    if changes.is_empty() {
        return Vec::new();
    }
    conversation.updated_at = ctx.now;

    let notifiable = notifiable_assignee_change(&changes, conversation, ctx);
    let published = Some(changes.externally_relevant()).filter(|diff| !diff.is_empty());
    let mut names = Vec::new();

    if changes.contains(ConversationField::Status) {
        match conversation.status {
            ConversationStatus::Open => names.push(EventName::ConversationOpened),
            ConversationStatus::Resolved => names.push(EventName::ConversationResolved),
            _ => {}
        }
        names.push(EventName::ConversationStatusChanged);
    }
    if changes.contains(ConversationField::ContactLastSeenAt) {
        names.push(EventName::ConversationRead);
    }
    if changes.contains(ConversationField::ContactId) {
        names.push(EventName::ConversationContactChanged);
    }
    if changes.is_externally_relevant() {
        names.push(EventName::ConversationUpdated);
    }

    tracing::debug!(
        "Conversation {} changed {:?}, emitting {:?}",
        conversation.id,
        changes.fields().collect::<Vec<_>>(),
        names
    );

    names
        .into_iter()
        .map(|name| {
            DomainEvent::new(
                name,
                ctx.now,
                EventPayload::Conversation(ConversationEventData {
                    conversation: conversation.clone(),
                    notifiable_assignee_change: notifiable,
                    changed_attributes: published.clone(),
                    performed_by: ctx.performed_by.clone(),
                }),
            )
        })
        .collect()
}

/// The assignee actually changed to someone other than the person making the change.
fn notifiable_assignee_change(
    changes: &ChangedAttributes,
    conversation: &Conversation,
    ctx: &TransitionContext,
) -> bool {
    changes.contains(ConversationField::AssigneeId)
        && conversation.assignee_id.is_some()
        && conversation.assignee_id != ctx.performed_by
}

/// open -> resolved, everything else -> open.
pub fn toggle_status(conversation: &mut Conversation, ctx: &TransitionContext) -> Vec<DomainEvent> {
    apply(conversation, ctx, |c| {
        c.status = match c.status {
            ConversationStatus::Open => ConversationStatus::Resolved,
            ConversationStatus::Resolved
            | ConversationStatus::Pending
            | ConversationStatus::Snoozed => ConversationStatus::Open,
        };
    })
}

pub fn resolve(conversation: &mut Conversation, ctx: &TransitionContext) -> Vec<DomainEvent> {
    apply(conversation, ctx, |c| c.status = ConversationStatus::Resolved)
}

pub fn reopen(conversation: &mut Conversation, ctx: &TransitionContext) -> Vec<DomainEvent> {
    apply(conversation, ctx, |c| c.status = ConversationStatus::Open)
}

/// `until = None` snoozes until the next customer message.
pub fn snooze(
    conversation: &mut Conversation,
    until: Option<DateTime<Utc>>,
    ctx: &TransitionContext,
) -> Vec<DomainEvent> {
    apply(conversation, ctx, |c| {
        c.status = ConversationStatus::Snoozed;
        c.snoozed_until = until;
    })
}

/// Force the conversation open for a human and announce the handoff. The
/// handoff event is emitted even when the conversation was already open.
pub fn bot_handoff(conversation: &mut Conversation, ctx: &TransitionContext) -> Vec<DomainEvent> {
    let mut events = reopen(conversation, ctx);
    conversation.updated_at = ctx.now;
    events.push(DomainEvent::new(
        EventName::ConversationBotHandoff,
        ctx.now,
        EventPayload::Conversation(ConversationEventData {
            conversation: conversation.clone(),
            notifiable_assignee_change: false,
            changed_attributes: None,
            performed_by: ctx.performed_by.clone(),
        }),
    ));
    events
}

pub fn assign_agent(
    conversation: &mut Conversation,
    assignee_id: Option<String>,
    ctx: &TransitionContext,
) -> Vec<DomainEvent> {
    apply(conversation, ctx, |c| c.assignee_id = assignee_id)
}

pub fn assign_team(
    conversation: &mut Conversation,
    team_id: Option<String>,
    ctx: &TransitionContext,
) -> Vec<DomainEvent> {
    apply(conversation, ctx, |c| c.team_id = team_id)
}

pub fn toggle_priority(
    conversation: &mut Conversation,
    priority: Option<Priority>,
    ctx: &TransitionContext,
) -> Vec<DomainEvent> {
    apply(conversation, ctx, |c| c.priority = priority)
}

pub fn update_labels(
    conversation: &mut Conversation,
    labels: Vec<String>,
    ctx: &TransitionContext,
) -> Vec<DomainEvent> {
    apply(conversation, ctx, |c| {
        let mut deduped: Vec<String> = Vec::with_capacity(labels.len());
        for label in labels {
            let label = label.trim().to_lowercase();
            if !label.is_empty() && !deduped.contains(&label) {
                deduped.push(label);
            }
        }
        c.labels = deduped;
    })
}

pub fn update_custom_attributes(
    conversation: &mut Conversation,
    attributes: Map<String, Value>,
    ctx: &TransitionContext,
) -> Vec<DomainEvent> {
    apply(conversation, ctx, |c| c.custom_attributes = attributes)
}

/// Replace additional attributes; anything that is not a JSON object is
/// stored as an empty map.
pub fn update_additional_attributes(
    conversation: &mut Conversation,
    attributes: Value,
    ctx: &TransitionContext,
) -> Vec<DomainEvent> {
    apply(conversation, ctx, |c| {
        c.additional_attributes = sanitize_attributes(Some(attributes))
    })
}

pub fn mark_contact_seen(conversation: &mut Conversation, ctx: &TransitionContext) -> Vec<DomainEvent> {
    let now = ctx.now;
    apply(conversation, ctx, |c| c.contact_last_seen_at = Some(now))
}

pub fn mark_agent_seen(conversation: &mut Conversation, ctx: &TransitionContext) -> Vec<DomainEvent> {
    let now = ctx.now;
    apply(conversation, ctx, |c| c.agent_last_seen_at = Some(now))
}

pub fn change_contact(
    conversation: &mut Conversation,
    contact_id: String,
    ctx: &TransitionContext,
) -> Vec<DomainEvent> {
    apply(conversation, ctx, |c| c.contact_id = contact_id)
}

/// Append a message and move the reply window.
///
/// Incoming messages reopen the conversation and start a window if none is
/// open. A human reply closes the window, announcing either the first reply of
/// the conversation's lifetime or a regular reply against the open window.
pub fn record_message(
    conversation: &mut Conversation,
    message: &Message,
    ctx: &TransitionContext,
) -> Vec<DomainEvent> {
    let mut reply_events = Vec::new();

    let mut events = apply(conversation, ctx, |c| {
        c.messages.push(message.clone());

        if message.is_incoming() {
            if matches!(
                c.status,
                ConversationStatus::Resolved
                    | ConversationStatus::Pending
                    | ConversationStatus::Snoozed
            ) {
                c.status = ConversationStatus::Open;
            }
            if c.waiting_since.is_none() {
                c.waiting_since = Some(message.created_at);
            }
        } else if message.is_human_reply() {
            if c.first_reply_created_at.is_none() {
                reply_events.push(DomainEvent::first_reply_created(ctx.now, message));
                c.first_reply_created_at = Some(message.created_at);
                c.waiting_since = None;
            } else if c.waiting_since.is_some() {
                reply_events.push(DomainEvent::reply_created(ctx.now, c.waiting_since, message));
                c.waiting_since = None;
            }
        }
    });
    conversation.updated_at = ctx.now;

    events.push(DomainEvent::message_created(ctx.now, message, conversation));
    events.extend(reply_events);
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{ConversationType, NewMessage};
    use chrono::Duration;
    use chrono_tz::Tz;
    use serde_json::json;

    fn inbox() -> Inbox {
        Inbox::new("inbox-1", "acc-1", Tz::UTC)
    }

    fn contact() -> Contact {
        Contact::new("contact-1", "acc-1")
    }

    fn request() -> CreateConversation {
        CreateConversation {
            account_id: "acc-1".to_string(),
            inbox_id: "inbox-1".to_string(),
            contact_id: "contact-1".to_string(),
            conversation_type: ConversationType::Standard,
            ..Default::default()
        }
    }

    fn new_conversation(now: DateTime<Utc>) -> Conversation {
        build_conversation("conv-1".to_string(), request(), &inbox(), &contact(), now)
    }

    fn names(events: &[DomainEvent]) -> Vec<EventName> {
        events.iter().map(|e| e.name).collect()
    }

    fn message(conversation: &Conversation, new: NewMessage, now: DateTime<Utc>) -> Message {
        Message::build(new, &conversation.account_id, &conversation.inbox_id, now)
    }

    #[test]
    fn test_initial_status_rules() {
        let mut blocked = contact();
        blocked.blocked = true;
        let mut bot_inbox = inbox();
        bot_inbox.active_bot = true;

        assert_eq!(initial_status(&inbox(), &blocked, true), ConversationStatus::Resolved);
        assert_eq!(initial_status(&bot_inbox, &contact(), true), ConversationStatus::Open);
        assert_eq!(initial_status(&bot_inbox, &contact(), false), ConversationStatus::Pending);
        assert_eq!(initial_status(&inbox(), &contact(), false), ConversationStatus::Open);
    }

    #[test]
    fn test_new_conversation_waits_from_creation() {
        let now = Utc::now();
        let conv = new_conversation(now);
        assert_eq!(conv.waiting_since, Some(now));
        assert_eq!(conv.display_id, None);
    }

    #[test]
    fn test_blocked_contact_conversation_still_waits_from_creation() {
        let now = Utc::now();
        let mut blocked = contact();
        blocked.blocked = true;
        let conv = build_conversation("c".to_string(), request(), &inbox(), &blocked, now);
        assert_eq!(conv.status, ConversationStatus::Resolved);
        assert_eq!(conv.waiting_since, Some(now));
    }

    #[test]
    fn test_malformed_additional_attributes_are_coerced() {
        let mut req = request();
        req.additional_attributes = Some(json!("oops"));
        let conv = build_conversation("c".to_string(), req, &inbox(), &contact(), Utc::now());
        assert!(conv.additional_attributes.is_empty());
    }

    #[test]
    fn test_toggle_status_table() {
        let now = Utc::now();
        let ctx = TransitionContext::system(now);
        let cases = [
            (ConversationStatus::Open, ConversationStatus::Resolved),
            (ConversationStatus::Resolved, ConversationStatus::Open),
            (ConversationStatus::Pending, ConversationStatus::Open),
            (ConversationStatus::Snoozed, ConversationStatus::Open),
        ];
        for (from, to) in cases {
            let mut conv = new_conversation(now);
            conv.status = from;
            toggle_status(&mut conv, &ctx);
            assert_eq!(conv.status, to, "toggle from {}", from);
        }
    }

    #[test]
    fn test_resolve_clears_waiting_and_snooze() {
        let now = Utc::now();
        let mut conv = new_conversation(now);
        snooze(&mut conv, Some(now + Duration::hours(2)), &TransitionContext::system(now));
        assert_eq!(conv.snoozed_until, Some(now + Duration::hours(2)));
        assert!(conv.waiting_since.is_some());

        let events = resolve(&mut conv, &TransitionContext::by("agent-1", now));
        assert_eq!(conv.status, ConversationStatus::Resolved);
        assert_eq!(conv.waiting_since, None);
        assert_eq!(conv.snoozed_until, None);
        assert_eq!(
            names(&events),
            vec![
                EventName::ConversationResolved,
                EventName::ConversationStatusChanged,
                EventName::ConversationUpdated
            ]
        );
    }

    #[test]
    fn test_resolving_twice_emits_nothing() {
        let now = Utc::now();
        let mut conv = new_conversation(now);
        let ctx = TransitionContext::system(now);
        resolve(&mut conv, &ctx);
        assert!(resolve(&mut conv, &ctx).is_empty());
    }

    #[test]
    fn test_snooze_keeps_waiting_since() {
        let now = Utc::now();
        let mut conv = new_conversation(now);
        snooze(&mut conv, None, &TransitionContext::system(now));
        assert_eq!(conv.status, ConversationStatus::Snoozed);
        assert_eq!(conv.waiting_since, Some(now));
    }

    #[test]
    fn test_incoming_message_reopens_and_restarts_window() {
        let created = Utc::now() - Duration::hours(5);
        let mut conv = new_conversation(created);
        resolve(&mut conv, &TransitionContext::system(created));

        let at = created + Duration::hours(2);
        let msg = message(&conv, NewMessage::incoming("conv-1", "hello again").at(at), at);
        let events = record_message(&mut conv, &msg, &TransitionContext::system(at));

        assert_eq!(conv.status, ConversationStatus::Open);
        assert_eq!(conv.waiting_since, Some(at));
        let names = names(&events);
        assert!(names.contains(&EventName::ConversationOpened));
        assert!(names.contains(&EventName::ConversationStatusChanged));
        assert!(names.contains(&EventName::MessageCreated));
    }

    #[test]
    fn test_incoming_message_keeps_existing_window() {
        let created = Utc::now() - Duration::hours(1);
        let mut conv = new_conversation(created);
        let at = created + Duration::minutes(10);
        let msg = message(&conv, NewMessage::incoming("conv-1", "anyone?"), at);
        record_message(&mut conv, &msg, &TransitionContext::system(at));
        assert_eq!(conv.waiting_since, Some(created));
    }

    #[test]
    fn test_first_human_reply_emits_first_reply_only() {
        let created = Utc::now() - Duration::hours(1);
        let mut conv = new_conversation(created);
        let at = created + Duration::minutes(30);
        let reply = message(&conv, NewMessage::outgoing("conv-1", "hi", "agent-1"), at);
        let events = record_message(&mut conv, &reply, &TransitionContext::by("agent-1", at));

        let names = names(&events);
        assert!(names.contains(&EventName::FirstReplyCreated));
        assert!(!names.contains(&EventName::ReplyCreated));
        assert_eq!(conv.first_reply_created_at, Some(at));
        assert_eq!(conv.waiting_since, None);
    }

    #[test]
    fn test_later_reply_carries_waiting_since() {
        let created = Utc::now() - Duration::hours(3);
        let mut conv = new_conversation(created);
        let ctx = |at| TransitionContext::system(at);

        let t1 = created + Duration::minutes(5);
        let first = message(&conv, NewMessage::outgoing("conv-1", "hi", "agent-1"), t1);
        record_message(&mut conv, &first, &ctx(t1));

        let t2 = created + Duration::hours(1);
        let question = message(&conv, NewMessage::incoming("conv-1", "question"), t2);
        record_message(&mut conv, &question, &ctx(t2));
        assert_eq!(conv.waiting_since, Some(t2));

        let t3 = created + Duration::hours(2);
        let answer = message(&conv, NewMessage::outgoing("conv-1", "answer", "agent-1"), t3);
        let events = record_message(&mut conv, &answer, &ctx(t3));

        let reply = events
            .iter()
            .find(|e| e.name == EventName::ReplyCreated)
            .expect("reply.created emitted");
        match &reply.payload {
            EventPayload::Reply { waiting_since, .. } => assert_eq!(*waiting_since, Some(t2)),
            other => panic!("unexpected payload {:?}", other),
        }
        assert_eq!(conv.waiting_since, None);
    }

    #[test]
    fn test_private_note_does_not_close_window() {
        let created = Utc::now() - Duration::hours(1);
        let mut conv = new_conversation(created);
        let at = created + Duration::minutes(10);
        let note = message(&conv, NewMessage::private_note("conv-1", "fyi", "agent-1"), at);
        let events = record_message(&mut conv, &note, &TransitionContext::system(at));

        assert_eq!(conv.waiting_since, Some(created));
        assert_eq!(conv.first_reply_created_at, None);
        assert_eq!(names(&events), vec![EventName::MessageCreated]);
    }

    #[test]
    fn test_notifiable_assignee_change() {
        let now = Utc::now();
        let mut conv = new_conversation(now);

        let events = assign_agent(&mut conv, Some("agent-2".into()), &TransitionContext::by("agent-1", now));
        assert!(events.iter().all(|e| match &e.payload {
            EventPayload::Conversation(d) => d.notifiable_assignee_change,
            _ => false,
        }));

        let events = assign_agent(&mut conv, Some("agent-1".into()), &TransitionContext::by("agent-1", now));
        match &events[0].payload {
            EventPayload::Conversation(d) => assert!(!d.notifiable_assignee_change),
            _ => panic!("expected conversation payload"),
        }

        let events = assign_agent(&mut conv, None, &TransitionContext::by("agent-2", now));
        match &events[0].payload {
            EventPayload::Conversation(d) => assert!(!d.notifiable_assignee_change),
            _ => panic!("expected conversation payload"),
        }
    }

    #[test]
    fn test_contact_seen_emits_read_without_update() {
        let now = Utc::now();
        let mut conv = new_conversation(now);
        let events = mark_contact_seen(&mut conv, &TransitionContext::system(now));
        assert_eq!(names(&events), vec![EventName::ConversationRead]);
    }

    #[test]
    fn test_contact_change_emits_contact_changed() {
        let now = Utc::now();
        let mut conv = new_conversation(now);
        let events = change_contact(&mut conv, "contact-2".into(), &TransitionContext::system(now));
        assert_eq!(names(&events), vec![EventName::ConversationContactChanged]);
    }

    #[test]
    fn test_bot_handoff_opens_and_announces() {
        let now = Utc::now();
        let mut conv = new_conversation(now);
        conv.status = ConversationStatus::Pending;

        let later = now + Duration::seconds(20);
        let events = bot_handoff(&mut conv, &TransitionContext::system(later));
        assert_eq!(conv.status, ConversationStatus::Open);
        assert_eq!(conv.updated_at, later);
        assert_eq!(events.last().map(|e| e.name), Some(EventName::ConversationBotHandoff));

        // already open: still announces the handoff
        let events = bot_handoff(&mut conv, &TransitionContext::system(later));
        assert_eq!(names(&events), vec![EventName::ConversationBotHandoff]);
    }

    #[test]
    fn test_labels_are_deduplicated() {
        let now = Utc::now();
        let mut conv = new_conversation(now);
        let events = update_labels(
            &mut conv,
            vec!["Billing".into(), "billing".into(), " ".into(), "vip".into()],
            &TransitionContext::system(now),
        );
        assert_eq!(conv.labels, vec!["billing".to_string(), "vip".to_string()]);
        assert_eq!(names(&events), vec![EventName::ConversationUpdated]);
    }

    #[test]
    fn test_language_change_publishes_update() {
        let now = Utc::now();
        let mut conv = new_conversation(now);
        let events = update_additional_attributes(
            &mut conv,
            json!({"conversation_language": "de"}),
            &TransitionContext::system(now),
        );
        assert_eq!(conv.language(), Some("de"));
        assert_eq!(names(&events), vec![EventName::ConversationUpdated]);

        let events = update_additional_attributes(
            &mut conv,
            json!({"conversation_language": "de", "browser": "safari"}),
            &TransitionContext::system(now),
        );
        assert!(events.is_empty());
    }
}
