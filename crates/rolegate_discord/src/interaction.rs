//! Commands and button clicks share handlers; this hides which one arrived.

use serenity::builder::{
    CreateEmbed, CreateInteractionResponse, CreateInteractionResponseMessage,
    EditInteractionResponse,
};
use serenity::client::Context;
use serenity::model::application::{CommandInteraction, ComponentInteraction};
use serenity::model::guild::Member;
use serenity::model::id::GuildId as DiscordGuildId;
use serenity::model::user::User;

use crate::commands::Button;

#[derive(Clone, Copy)]
pub(crate) enum Invocation<'a> {
    Command(&'a CommandInteraction),
    Button(&'a ComponentInteraction, Button),
}

impl<'a> Invocation<'a> {
    pub fn user(&self) -> &'a User {
        match self {
            Invocation::Command(c) => &c.user,
            Invocation::Button(b, _) => &b.user,
        }
    }

    pub fn guild_id(&self) -> Option<DiscordGuildId> {
        match self {
            Invocation::Command(c) => c.guild_id,
            Invocation::Button(b, _) => b.guild_id,
        }
    }

    pub fn member(&self) -> Option<&'a Member> {
        match self {
            Invocation::Command(c) => c.member.as_deref(),
            Invocation::Button(b, _) => b.member.as_ref(),
        }
    }

    async fn respond(&self, ctx: &Context, response: CreateInteractionResponse) -> serenity::Result<()> {
        match self {
            Invocation::Command(c) => c.create_response(&ctx.http, response).await,
            Invocation::Button(b, _) => b.create_response(&ctx.http, response).await,
        }
    }

    /// Answer with an embed.
    pub async fn reply(&self, ctx: &Context, embed: CreateEmbed, ephemeral: bool) -> serenity::Result<()> {
        let message = CreateInteractionResponseMessage::new()
            .embed(embed)
            .ephemeral(ephemeral);
        self.respond(ctx, CreateInteractionResponse::Message(message))
            .await
    }

    /// Acknowledge now and answer later with [`Invocation::edit`].
    pub async fn defer(&self, ctx: &Context, ephemeral: bool) -> serenity::Result<()> {
        let message = CreateInteractionResponseMessage::new().ephemeral(ephemeral);
        self.respond(ctx, CreateInteractionResponse::Defer(message))
            .await
    }

    pub async fn edit(&self, ctx: &Context, embed: CreateEmbed) -> serenity::Result<()> {
        let edit = EditInteractionResponse::new().embed(embed);
        match self {
            Invocation::Command(c) => c.edit_response(&ctx.http, edit).await.map(|_| ()),
            Invocation::Button(b, _) => b.edit_response(&ctx.http, edit).await.map(|_| ()),
        }
    }
}
