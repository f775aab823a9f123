//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! The in-game loop

use super::{Session, SessionError, SessionState};
use crate::commands::{CommandContext, CommandOutput, PlayState, actions};
use crate::presence::GameMessage;
use crate::telnet::protocol::ansi::Color;
use mudhall_common::{CharacterId, UserId};
use std::io;
use tokio::sync::mpsc::UnboundedReceiver;

const PROMPT: &str = "> ";

impl Session {
    /// Play the selected character until `/quit` or disconnect
    pub(super) async fn play(&mut self) -> Result<(), SessionError> {
        let (Some(user_id), Some(character_id)) = (self.guard.user, self.guard.character) else {
            self.state = SessionState::Authenticated;
            return Ok(());
        };
        let presence = self.context.presence.clone();
        let mut inbox = presence.enter(character_id);
        let (_, name) = self.describe();
        let name = name.unwrap_or_default();
        tracing::info!(character = %name, "Entered the game");
        self.announce(character_id, &format!("{} has entered the game.", name));

        let mut play = PlayState::default();
        let result = self
            .game_loop(user_id, character_id, &mut play, &mut inbox)
            .await;

        self.announce(character_id, &format!("{} has left the game.", name));
        tracing::info!(character = %name, "Left the game");
        self.guard.release_character();
        if self.state == SessionState::InGame {
            self.state = SessionState::Authenticated;
        }
        result
    }

    async fn game_loop(
        &self,
        user_id: UserId,
        character_id: CharacterId,
        play: &mut PlayState,
        inbox: &mut UnboundedReceiver<GameMessage>,
    ) -> Result<(), SessionError> {
        let arrival = self.execute(user_id, character_id, play, "look");
        self.show(&arrival).await?;

        loop {
            self.send(PROMPT).await?;
            let line = loop {
                tokio::select! {
                    line = self.connection.read_line() => break line?,
                    Some(message) = inbox.recv() => {
                        if self.deliver(message, play).await? {
                            self.send(PROMPT).await?;
                        }
                    }
                }
            };

            let output = self.execute(user_id, character_id, play, &line);
            self.show(&output).await?;
            if output.quit {
                return Ok(());
            }
        }
    }

    /// Run one line of input against the world
    fn execute(
        &self,
        user_id: UserId,
        character_id: CharacterId,
        play: &mut PlayState,
        line: &str,
    ) -> CommandOutput {
        let mut ctx = CommandContext::new(
            &self.context.store,
            &self.context.presence,
            user_id,
            character_id,
            play,
        );
        match line.trim().strip_prefix('/') {
            Some(command) => self.context.commands.dispatch(&mut ctx, command),
            None => actions::perform(&mut ctx, line),
        }
        ctx.into_output()
    }

    async fn show(&self, output: &CommandOutput) -> io::Result<()> {
        for line in &output.lines {
            self.send_line(line).await?;
        }
        Ok(())
    }

    /// Print a message from another session. Returns whether anything was
    /// printed.
    async fn deliver(&self, message: GameMessage, play: &mut PlayState) -> io::Result<bool> {
        let text = match message {
            GameMessage::Notice(_) if play.silent => return Ok(false),
            GameMessage::Notice(text) => text,
            GameMessage::Tell { from, text } => {
                play.reply_to = Some(from);
                let sender = self
                    .context
                    .store
                    .character(from)
                    .map(|c| c.name)
                    .unwrap_or_else(|| "Someone".to_string());
                self.paint(Color::Magenta, &format!("{} tells you, \"{}\"", sender, text))
            }
        };
        self.send_line("").await?;
        self.send_line(&text).await?;
        Ok(true)
    }

    fn announce(&self, character_id: CharacterId, text: &str) {
        let store = &self.context.store;
        if let Some(character) = store.character(character_id) {
            self.context
                .presence
                .notify_room(store, character.room_id, Some(character_id), text);
        }
    }
}
