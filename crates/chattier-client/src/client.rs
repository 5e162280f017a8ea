//! The client session: wiring, channel lifecycle and event dispatch.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use chattier_backend::{
    event_queue, AuthProvider, AuthUser, BlobStorage, EventKind, EventQueue, RealtimeStore,
    TopicEvent,
};
use chattier_shared::constants::content_type_for;
use chattier_shared::error::{ChatError, RemoteWriteError, ValidationError};
use chattier_shared::paths;
use chattier_shared::types::{
    direct_channel_id, Author, Channel, ChannelId, Creator, Message, TypingUser, UserId,
};

use crate::composer::{Composer, MarkerTransition};
use crate::directory::{ChannelDirectory, ChannelForm};
use crate::messages::MessageLog;
use crate::notifications::NotificationCenter;
use crate::presence::PresenceRoster;
use crate::registry::{Owner, SubscriptionRegistry};
use crate::starred::StarredChannels;
use crate::typing::TypingRoster;
use crate::uploads::{UploadPoll, UploadState, Uploader};

#[derive(Debug)]
enum ChannelSession {
    NoChannel,
    Active { channel: Channel, starred: bool },
}

/// One signed-in chat session.
///
/// All collaborators are injected at construction; nothing is looked up
/// ambiently. Remote events from every subscription land on one queue
/// and are applied by [`ChatClient::pump`] / [`ChatClient::tick`], so
/// state mutation is single-threaded and interleaves with user intents.
pub struct ChatClient {
    store: Arc<dyn RealtimeStore>,
    auth: Arc<dyn AuthProvider>,
    storage: Arc<dyn BlobStorage>,
    user: AuthUser,
    events: EventQueue,
    registry: SubscriptionRegistry,
    session: ChannelSession,
    log: MessageLog,
    typing: TypingRoster,
    presence: PresenceRoster,
    notifications: NotificationCenter,
    starred: StarredChannels,
    directory: ChannelDirectory,
    composer: Composer,
    uploader: Uploader,
    starred_path: String,
    connected: bool,
}

impl ChatClient {
    pub fn new(
        store: Arc<dyn RealtimeStore>,
        auth: Arc<dyn AuthProvider>,
        storage: Arc<dyn BlobStorage>,
        user: AuthUser,
    ) -> Self {
        let (sink, events) = event_queue();
        let registry = SubscriptionRegistry::new(store.clone(), sink);
        let starred_path = paths::user_starred(&user.uid);
        Self {
            store,
            auth,
            storage,
            user,
            events,
            registry,
            session: ChannelSession::NoChannel,
            log: MessageLog::new(),
            typing: TypingRoster::new(),
            presence: PresenceRoster::new(),
            notifications: NotificationCenter::new(),
            starred: StarredChannels::new(),
            directory: ChannelDirectory::new(),
            composer: Composer::new(),
            uploader: Uploader::new(),
            starred_path,
            connected: false,
        }
    }

    /// Establish the global subscriptions: connectivity, the channel
    /// directory, the user roster, presence and the own star set.
    pub fn connect(&mut self) {
        self.registry
            .register(Owner::Global, paths::CONNECTED, EventKind::ValueChanged);
        self.registry
            .register(Owner::Global, paths::CHANNELS_ROOT, EventKind::ChildAdded);
        self.registry
            .register(Owner::Global, paths::USERS_ROOT, EventKind::ChildAdded);
        self.registry
            .register(Owner::Global, paths::PRESENCE_ROOT, EventKind::ChildAdded);
        self.registry
            .register(Owner::Global, paths::PRESENCE_ROOT, EventKind::ChildRemoved);
        let starred = self.starred_path.clone();
        self.registry
            .register(Owner::Global, &starred, EventKind::ChildAdded);
        self.registry
            .register(Owner::Global, &starred, EventKind::ChildRemoved);
        info!(uid = %self.user.uid, "session subscriptions established");
    }

    // ------------------------------------------------------------------
    // Event loop
    // ------------------------------------------------------------------

    /// Apply every event already queued; returns how many were applied.
    pub async fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events.try_recv() {
            self.apply_event(event).await;
            applied += 1;
        }
        applied
    }

    /// Await and apply the next event. Returns false once the queue can
    /// no longer produce events.
    pub async fn tick(&mut self) -> bool {
        match self.events.recv().await {
            Some(event) => {
                self.apply_event(event).await;
                true
            }
            None => false,
        }
    }

    async fn apply_event(&mut self, event: TopicEvent) {
        if event.path == paths::CONNECTED && event.kind == EventKind::ValueChanged {
            let connected = event.value.as_bool().unwrap_or(false);
            self.handle_connectivity(connected).await;
            return;
        }

        if event.path == paths::CHANNELS_ROOT && event.kind == EventKind::ChildAdded {
            if let Some(id) = self.directory.apply_added(&event.value) {
                // count every public feed except the one on screen
                let is_active = matches!(
                    &self.session,
                    ChannelSession::Active { channel, .. } if channel.id == id
                );
                if !is_active {
                    // history present at discovery is not unread
                    let baseline = match self.store.fetch(&paths::messages(&id)).await {
                        Ok(Some(Value::Object(map))) => map.len(),
                        _ => 0,
                    };
                    self.notifications.seed(&id, baseline);
                    self.registry.register(
                        Owner::Channel(id.clone()),
                        &paths::messages(&id),
                        EventKind::ChildAdded,
                    );
                }
            }
            return;
        }

        if event.path == paths::USERS_ROOT && event.kind == EventKind::ChildAdded {
            let uid = UserId(event.key);
            if uid != self.user.uid {
                self.presence.apply_user_added(uid, &event.value);
            }
            return;
        }

        if event.path == paths::PRESENCE_ROOT {
            let uid = UserId(event.key);
            if uid != self.user.uid {
                self.presence
                    .apply_presence(uid, event.kind == EventKind::ChildAdded);
            }
            return;
        }

        if event.path == self.starred_path {
            match event.kind {
                EventKind::ChildAdded => self.starred.apply_added(&event.key, &event.value),
                EventKind::ChildRemoved => self.starred.apply_removed(&event.key),
                EventKind::ValueChanged => {}
            }
            if let ChannelSession::Active { channel, starred } = &mut self.session {
                if channel.id.as_str() == event.key {
                    *starred = event.kind == EventKind::ChildAdded;
                }
            }
            return;
        }

        self.apply_channel_event(event);
    }

    /// Events scoped to a channel: the active channel's feed and typing
    /// set, and the message feeds counted for notifications. Anything
    /// addressed to a channel no longer active is dropped here.
    fn apply_channel_event(&mut self, event: TopicEvent) {
        if let ChannelSession::Active { channel, .. } = &self.session {
            let feed = paths::message_feed(&channel.id, channel.is_direct());
            if event.path == feed && event.kind == EventKind::ChildAdded {
                match serde_json::from_value::<Message>(event.value) {
                    Ok(message) => self.log.append(message),
                    Err(e) => warn!(channel = %channel.id, error = %e, "malformed message"),
                }
                if !channel.is_direct() {
                    let id = channel.id.clone();
                    self.notifications.record(&id, event.child_count, true);
                }
                return;
            }

            if event.path == paths::typing(&channel.id) {
                let uid = UserId(event.key);
                if uid == self.user.uid {
                    return;
                }
                match event.kind {
                    EventKind::ChildAdded => self.typing.apply_added(TypingUser {
                        id: uid,
                        name: event.value.as_str().unwrap_or_default().to_string(),
                    }),
                    EventKind::ChildRemoved => self.typing.apply_removed(&uid),
                    EventKind::ValueChanged => {}
                }
                return;
            }
        }

        if event.kind == EventKind::ChildAdded {
            if let Some(id) = paths::channel_of_message_feed(&event.path) {
                self.notifications.record(&id, event.child_count, false);
                return;
            }
        }

        debug!(path = %event.path, kind = %event.kind, "ignoring event for inactive topic");
    }

    async fn handle_connectivity(&mut self, connected: bool) {
        self.connected = connected;
        if !connected {
            return;
        }

        // publish our presence entry and have the server retract it if
        // this session drops without signing out
        let presence = paths::presence_entry(&self.user.uid);
        if let Err(e) = self.store.write(&presence, Value::Bool(true)).await {
            warn!(error = %e, "failed to publish presence");
        }
        self.store.on_disconnect_remove(&presence);

        // same for a typing marker left behind by an abrupt drop
        if let ChannelSession::Active { channel, .. } = &self.session {
            let marker = paths::typing_marker(&channel.id, &self.user.uid);
            self.store.on_disconnect_remove(&marker);
        }
        debug!("connectivity established");
    }

    // ------------------------------------------------------------------
    // Channel lifecycle
    // ------------------------------------------------------------------

    /// Switch the active channel. The departing channel's listeners are
    /// torn down before the new channel's are registered, so no event of
    /// the old interval can land in the new state.
    pub async fn select_channel(&mut self, channel: Channel) -> Result<(), ChatError> {
        if let ChannelSession::Active { channel: prev, .. } = &self.session {
            if prev.id == channel.id {
                return Ok(());
            }
            let prev = prev.clone();
            self.registry.teardown_owner(&Owner::Channel(prev.id.clone()));

            // peers must not keep seeing us typing in a channel we left
            let marker = paths::typing_marker(&prev.id, &self.user.uid);
            if let Err(e) = self.store.remove(&marker).await {
                warn!(channel = %prev.id, error = %e, "failed to retract typing marker");
            }
            self.composer.reset();

            // keep counting the public channel we just left
            if !prev.is_direct() && self.directory.contains(&prev.id) {
                self.registry.register(
                    Owner::Channel(prev.id.clone()),
                    &paths::messages(&prev.id),
                    EventKind::ChildAdded,
                );
            }
        }

        self.log.clear();
        self.typing.clear();
        self.notifications.mark_read(&channel.id);

        let owner = Owner::Channel(channel.id.clone());
        // a notification-only listener on this feed must go first so the
        // fresh subscription replays history into the cleared log
        self.registry.teardown_owner(&owner);

        let feed = paths::message_feed(&channel.id, channel.is_direct());
        self.registry
            .register(owner.clone(), &feed, EventKind::ChildAdded);
        let typing = paths::typing(&channel.id);
        self.registry
            .register(owner.clone(), &typing, EventKind::ChildAdded);
        self.registry
            .register(owner, &typing, EventKind::ChildRemoved);

        if self.connected {
            self.store
                .on_disconnect_remove(&paths::typing_marker(&channel.id, &self.user.uid));
        }

        let starred = if channel.is_direct() {
            false
        } else {
            self.fetch_starred_flag(&channel.id).await
        };

        info!(channel = %channel.id, direct = channel.is_direct(), "channel selected");
        self.session = ChannelSession::Active { channel, starred };
        Ok(())
    }

    /// Open (or create) the direct conversation with `peer`.
    pub async fn select_direct(
        &mut self,
        peer: &UserId,
        peer_name: &str,
    ) -> Result<(), ChatError> {
        let id = direct_channel_id(&self.user.uid, peer);
        self.select_channel(Channel::direct(id, peer_name)).await
    }

    /// Select the first known channel if none is active yet.
    pub async fn ensure_initial_channel(&mut self) -> Result<(), ChatError> {
        if matches!(self.session, ChannelSession::NoChannel) {
            if let Some(first) = self.directory.first().cloned() {
                self.select_channel(first).await?;
            }
        }
        Ok(())
    }

    async fn fetch_starred_flag(&self, channel: &ChannelId) -> bool {
        match self.store.fetch(&self.starred_path).await {
            Ok(Some(Value::Object(map))) => map.contains_key(channel.as_str()),
            Ok(_) => false,
            Err(e) => {
                warn!(error = %e, "failed to read starred channels");
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Messaging
    // ------------------------------------------------------------------

    /// Record the latest draft text, publishing or retracting the own
    /// typing marker when the draft transitions.
    pub async fn set_draft(&mut self, text: &str) -> Result<(), ChatError> {
        let ChannelSession::Active { channel, .. } = &self.session else {
            return Err(ChatError::NoActiveChannel);
        };
        let marker = paths::typing_marker(&channel.id, &self.user.uid);
        match self.composer.set_draft(text) {
            Some(MarkerTransition::Set) => {
                self.store
                    .write(&marker, Value::String(self.user.display_name.clone()))
                    .await?;
            }
            Some(MarkerTransition::Remove) => {
                self.store.remove(&marker).await?;
            }
            None => {}
        }
        Ok(())
    }

    pub fn draft(&self) -> &str {
        self.composer.draft()
    }

    /// Send the draft as a text message. An empty draft sends nothing.
    pub async fn send_message(&mut self) -> Result<(), ChatError> {
        let ChannelSession::Active { channel, .. } = &self.session else {
            return Err(ChatError::NoActiveChannel);
        };
        if self.composer.draft().is_empty() {
            return Ok(());
        }
        let channel = channel.clone();
        let feed = paths::message_feed(&channel.id, channel.is_direct());

        let message = Message::text(
            Utc::now().timestamp_millis(),
            self.author(),
            self.composer.draft(),
        );
        let value = serde_json::to_value(&message)
            .map_err(|e| RemoteWriteError::new("push", &feed, e.to_string()))?;
        self.store.push(&feed, value).await?;

        self.composer.take_draft();
        let marker = paths::typing_marker(&channel.id, &self.user.uid);
        if let Err(e) = self.store.remove(&marker).await {
            warn!(error = %e, "failed to retract typing marker after send");
        }
        Ok(())
    }

    /// Case-insensitive search over the active channel's text messages.
    pub fn search_messages(&self, query: &str) -> Vec<&Message> {
        self.log.search(query)
    }

    // ------------------------------------------------------------------
    // Channels & stars
    // ------------------------------------------------------------------

    /// Create a public channel from the add-channel form.
    pub async fn add_channel(&mut self, form: &ChannelForm) -> Result<ChannelId, ChatError> {
        form.validate()?;
        let key = self.store.push_id();
        let channel = Channel::public(
            key,
            form.name.clone(),
            form.details.clone(),
            Some(Creator {
                name: self.user.display_name.clone(),
                avatar: self.user.photo_url.clone(),
            }),
        );
        let path = paths::channel(&channel.id);
        let value = serde_json::to_value(&channel)
            .map_err(|e| RemoteWriteError::new("write", &path, e.to_string()))?;
        self.store.write(&path, value).await?;
        info!(channel = %channel.id, name = %channel.name, "channel created");
        Ok(channel.id)
    }

    /// Star or unstar the active public channel.
    pub async fn toggle_star(&mut self) -> Result<(), ChatError> {
        let (channel, was_starred) = match &self.session {
            ChannelSession::Active { channel, starred } => (channel.clone(), *starred),
            ChannelSession::NoChannel => return Err(ChatError::NoActiveChannel),
        };
        if channel.is_direct() {
            return Ok(());
        }
        let path = paths::user_starred_channel(&self.user.uid, &channel.id);
        if was_starred {
            self.store.remove(&path).await?;
        } else {
            self.store.write(&path, channel.starred_snapshot()).await?;
        }
        if let ChannelSession::Active { starred, .. } = &mut self.session {
            *starred = !was_starred;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Media upload
    // ------------------------------------------------------------------

    /// Begin uploading a media file for the active channel. The target
    /// feed is captured now; switching channels mid-transfer does not
    /// redirect the resulting file message.
    pub fn start_upload(&mut self, file_name: &str, data: Bytes) -> Result<(), ChatError> {
        let ChannelSession::Active { channel, .. } = &self.session else {
            return Err(ChatError::NoActiveChannel);
        };
        let content_type = content_type_for(file_name)
            .ok_or_else(|| ValidationError::UnsupportedFileType(file_name.to_string()))?;
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, e)| e.to_ascii_lowercase())
            .unwrap_or_default();

        let object = paths::upload_object(
            &channel.id,
            channel.is_direct(),
            &uuid::Uuid::new_v4().to_string(),
            &ext,
        );
        let feed = paths::message_feed(&channel.id, channel.is_direct());
        let task = self.storage.upload(&object, data, content_type);
        self.uploader.begin(task, feed);
        info!(object = %object, "upload started");
        Ok(())
    }

    /// Advance the pending upload by one event; sends the file message
    /// on completion. Returns true while the transfer is still running.
    pub async fn poll_upload(&mut self) -> Result<bool, ChatError> {
        match self.uploader.poll().await {
            UploadPoll::Progress(_) => Ok(true),
            UploadPoll::Completed { url, feed_path } => {
                let message = Message::image(Utc::now().timestamp_millis(), self.author(), url);
                let value = serde_json::to_value(&message)
                    .map_err(|e| RemoteWriteError::new("push", &feed_path, e.to_string()))?;
                self.store.push(&feed_path, value).await?;
                Ok(false)
            }
            UploadPoll::Failed(message) => {
                warn!(error = %message, "upload failed");
                Ok(false)
            }
            UploadPoll::Idle => Ok(false),
        }
    }

    /// Drive the pending upload to its terminal state.
    pub async fn drive_upload(&mut self) -> Result<(), ChatError> {
        while self.poll_upload().await? {}
        Ok(())
    }

    pub fn cancel_upload(&mut self) {
        self.uploader.cancel();
    }

    pub fn upload_state(&self) -> UploadState {
        self.uploader.state()
    }

    // ------------------------------------------------------------------
    // Profile & session end
    // ------------------------------------------------------------------

    /// Upload a new avatar image, attach it to the identity and mirror
    /// it into the stored profile.
    pub async fn change_avatar(&mut self, data: Bytes) -> Result<(), ChatError> {
        use chattier_backend::UploadEvent;

        let object = paths::avatar_object(&self.user.uid);
        let mut task = self.storage.upload(&object, data, "image/jpeg");
        let url = loop {
            match task.next_event().await {
                Some(UploadEvent::Progress { .. }) => continue,
                Some(UploadEvent::Complete { url }) => break url,
                Some(UploadEvent::Failed { message }) => {
                    return Err(chattier_shared::error::UploadError::Transfer(message).into());
                }
                None => return Err(chattier_shared::error::UploadError::Cancelled.into()),
            }
        };

        self.user = self
            .auth
            .update_profile(&self.user.uid, &self.user.display_name, &url)
            .await?;
        self.store
            .write(&paths::user_avatar(&self.user.uid), Value::String(url))
            .await?;
        info!(uid = %self.user.uid, "avatar updated");
        Ok(())
    }

    /// End the session: retract presence and any typing marker, tear
    /// down every subscription and sign out with the provider.
    pub async fn sign_out(&mut self) -> Result<(), ChatError> {
        if let ChannelSession::Active { channel, .. } = &self.session {
            let marker = paths::typing_marker(&channel.id, &self.user.uid);
            if let Err(e) = self.store.remove(&marker).await {
                warn!(error = %e, "failed to retract typing marker");
            }
        }
        if let Err(e) = self
            .store
            .remove(&paths::presence_entry(&self.user.uid))
            .await
        {
            warn!(error = %e, "failed to retract presence entry");
        }

        self.registry.teardown_all();
        self.uploader.cancel();
        self.composer.reset();
        self.session = ChannelSession::NoChannel;
        self.log.clear();
        self.typing.clear();
        self.presence.clear();
        self.notifications.clear();
        self.starred.clear();
        self.directory.clear();
        self.connected = false;

        self.auth.sign_out().await?;
        info!(uid = %self.user.uid, "signed out");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn user(&self) -> &AuthUser {
        &self.user
    }

    pub fn active_channel(&self) -> Option<&Channel> {
        match &self.session {
            ChannelSession::Active { channel, .. } => Some(channel),
            ChannelSession::NoChannel => None,
        }
    }

    pub fn is_channel_starred(&self) -> bool {
        matches!(&self.session, ChannelSession::Active { starred: true, .. })
    }

    pub fn messages(&self) -> &[Message] {
        self.log.messages()
    }

    pub fn unique_author_count(&self) -> usize {
        self.log.unique_author_count()
    }

    pub fn typing_users(&self) -> &[TypingUser] {
        self.typing.users()
    }

    pub fn presence(&self) -> &PresenceRoster {
        &self.presence
    }

    pub fn unread_count(&self, channel: &ChannelId) -> usize {
        self.notifications.unread_count(channel)
    }

    pub fn starred_channels(&self) -> &[Channel] {
        self.starred.channels()
    }

    pub fn channels(&self) -> &[Channel] {
        self.directory.channels()
    }

    fn author(&self) -> Author {
        Author {
            id: self.user.uid.clone(),
            name: self.user.display_name.clone(),
            avatar: self.user.photo_url.clone(),
        }
    }
}
