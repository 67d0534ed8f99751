use clap::Parser;
use tracing_subscriber::EnvFilter;

use pixara::api::models::{CommentId, NewPost, PostId, Upload, User, UserId};
use pixara::api::SocialApi;
use pixara::config::{Cli, Command, Config};
use pixara::error::ClientError;
use pixara::interaction::{FollowOutcome, InteractionError};
use pixara::session::RegistrationForm;
use pixara::state::AppState;
use pixara::views::{
    CommentThread, ExploreView, Feedback, HomeView, PostFeed, ProfileView, SettingsView,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::debug!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;
    let state = AppState::from_config(config)?;
    tracing::debug!("API at {}", state.api.base_url());

    run(&state, cli.command).await
}

async fn run(state: &AppState, command: Command) -> anyhow::Result<()> {
    let sessions = &state.sessions;
    let restored = if command.uses_stored_session() {
        sessions.restore().await
    } else {
        None
    };

    match command {
        Command::Login { username, password } => {
            let user = sessions.login(&username, &password).await?;
            println!("Logged in as {} (id {})", user.username, user.id);
        }

        Command::Register {
            username,
            email,
            password,
            confirm_password,
        } => {
            let form = RegistrationForm::new(username, email, password, confirm_password);
            let user = sessions.register(&form).await?;
            println!("Welcome, {}! Your id is {}", user.username, user.id);
        }

        Command::Logout => {
            sessions.logout();
            println!("Logged out");
        }

        Command::Whoami => match restored {
            Some(user) => print_user(&user),
            None => println!("Not logged in"),
        },

        Command::Feed => {
            let home = HomeView::new(state.view_context());
            home.mount().await?;
            print_posts(home.feed());
            home.dispose();
        }

        Command::Explore => {
            let explore = ExploreView::new(state.view_context());
            explore.mount().await;
            print_posts(explore.feed());
            explore.dispose();
        }

        Command::Profile { user_id } => {
            let ctx = state.view_context();
            let profile = match user_id {
                Some(id) => ProfileView::new(ctx, UserId(id)),
                None => ProfileView::own(ctx)?,
            };
            profile.mount().await?;

            if let Some(user) = profile.user() {
                print_user(&user);
            }
            if let Some(stats) = profile.stats() {
                println!(
                    "{} followers · {} following",
                    stats.followers_count, stats.following_count
                );
            }
            if let Some(button) = profile.follow_button() {
                println!("[{}]", button.label());
            }
            println!();
            print_posts(profile.feed());
            profile.dispose();
        }

        Command::Post { caption, image } => {
            let image = match image {
                Some(path) => Some(Upload::from_path(&path).await?),
                None => None,
            };
            let home = HomeView::new(state.view_context());
            let post = home.create_post(NewPost { caption, image }).await?;
            println!("Published post #{}", post.id);
        }

        Command::DeletePost { post_id } => {
            let home = HomeView::new(state.view_context());
            home.delete_post(PostId(post_id)).await?;
            println!("Deleted post #{}", post_id);
        }

        Command::EditPost { post_id, caption } => {
            let home = HomeView::new(state.view_context());
            let post = home.edit_caption(PostId(post_id), &caption).await?;
            println!("Updated post #{}: {}", post.id, post.caption);
        }

        Command::Like { post_id } => {
            let post_id = PostId(post_id);
            let ticket = state.store.begin_fetch();
            let post = state.api.get_post(post_id).await?;
            state.store.ingest_posts(ticket, vec![post]);

            let ctx = state.view_context();
            match ctx.interactions().toggle_like(post_id).await {
                Ok(like) => println!(
                    "{} post #{} ({} likes)",
                    if like.liked { "Liked" } else { "Unliked" },
                    post_id,
                    like.count
                ),
                Err(InteractionError::LikeFailed {
                    previous, source, ..
                }) => {
                    ctx.interactions().revert_like(post_id, previous);
                    return Err(source.into());
                }
                Err(e) => return Err(e.into()),
            }
        }

        Command::Follow { user_id } => {
            let profile = ProfileView::new(state.view_context(), UserId(user_id));
            profile.mount().await?;
            match profile.toggle_follow().await? {
                FollowOutcome::Toggled(true) => println!("Following user {}", user_id),
                FollowOutcome::Toggled(false) => println!("Unfollowed user {}", user_id),
                FollowOutcome::Ignored => println!("Nothing to do"),
            }
        }

        Command::Comments { post_id } => {
            let thread = CommentThread::new(state.view_context(), PostId(post_id));
            thread.mount().await?;
            let comments = thread.comments();
            if comments.is_empty() {
                println!("No comments yet");
            }
            for comment in comments {
                let affordances = thread.affordances(&comment);
                println!(
                    "#{} @{}: {}{}",
                    comment.id,
                    comment.user.username,
                    comment.content,
                    if affordances.can_edit {
                        "  [edit] [delete]"
                    } else {
                        ""
                    }
                );
            }
            thread.dispose();
        }

        Command::Comment { post_id, content } => {
            let thread = CommentThread::new(state.view_context(), PostId(post_id));
            thread.edit_draft(content).await;
            let comment = thread.submit().await?;
            println!("Commented #{} on post #{}", comment.id, post_id);
        }

        Command::EditComment {
            post_id,
            comment_id,
            content,
        } => {
            let thread = CommentThread::new(state.view_context(), PostId(post_id));
            thread.mount().await?;
            let comment = thread
                .edit_comment(CommentId(comment_id), &content)
                .await?;
            println!("Updated comment #{}", comment.id);
        }

        Command::DeleteComment {
            post_id,
            comment_id,
        } => {
            let thread = CommentThread::new(state.view_context(), PostId(post_id));
            thread.mount().await?;
            thread.delete_comment(CommentId(comment_id)).await?;
            println!("Deleted comment #{}", comment_id);
        }

        Command::Settings {
            username,
            email,
            bio,
            location,
            phone,
            website,
            gender,
            birthdate,
            profile_picture,
            cover_photo,
        } => {
            if restored.is_none() {
                return Err(ClientError::NotAuthenticated.into());
            }
            let profile_picture = match profile_picture {
                Some(path) => Some(Upload::from_path(&path).await?),
                None => None,
            };
            let cover_photo = match cover_photo {
                Some(path) => Some(Upload::from_path(&path).await?),
                None => None,
            };

            let settings = SettingsView::new(state.view_context());
            settings.edit(|form| {
                let fields = [
                    (&mut form.username, username),
                    (&mut form.email, email),
                    (&mut form.bio, bio),
                    (&mut form.location, location),
                    (&mut form.phone, phone),
                    (&mut form.website, website),
                    (&mut form.gender, gender),
                    (&mut form.birthdate, birthdate),
                ];
                for (slot, value) in fields {
                    if let Some(value) = value {
                        *slot = value;
                    }
                }
                form.profile_picture = profile_picture;
                form.cover_photo = cover_photo;
            });

            let result = settings.save().await;
            match settings.feedback() {
                Some(Feedback::Success(msg)) => println!("{}", msg),
                Some(Feedback::Error(msg)) => eprintln!("{}", msg),
                None => {}
            }
            result?;
        }

        Command::Stats { user_id } => {
            let profile = ProfileView::new(state.view_context(), UserId(user_id));
            let stats = profile.refresh_stats().await?;
            println!(
                "{} followers · {} following",
                stats.followers_count, stats.following_count
            );
        }

        Command::Followers { user_id } => {
            print_users(&state.api.list_followers(UserId(user_id)).await?);
        }

        Command::Following { user_id } => {
            print_users(&state.api.list_following(UserId(user_id)).await?);
        }

        Command::Resolve { username } => {
            let id = state.api.resolve_user_id(&username).await?;
            println!("{}", id);
        }
    }

    Ok(())
}

fn print_user(user: &User) {
    println!("@{} (id {})", user.username, user.id);
    let details = [
        ("email", &user.email),
        ("bio", &user.bio),
        ("location", &user.location),
        ("website", &user.website),
    ];
    for (label, value) in details {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            println!("  {}: {}", label, value);
        }
    }
}

fn print_users(users: &[User]) {
    if users.is_empty() {
        println!("Nobody here yet");
    }
    for user in users {
        println!("{:>6}  @{}", user.id, user.username);
    }
}

fn print_posts(feed: &PostFeed) {
    let posts = feed.posts();
    if posts.is_empty() {
        println!("No posts yet");
        return;
    }
    for post in &posts {
        let follow = feed
            .follow_button(post)
            .map(|button| format!("  [{}]", button.label()))
            .unwrap_or_default();
        println!(
            "#{} @{}{} · {}",
            post.id,
            post.user.username,
            follow,
            post.created_at.format("%Y-%m-%d %H:%M")
        );
        if !post.caption.is_empty() {
            println!("  {}", post.caption);
        }
        if let Some(ref image) = post.image {
            println!("  [image] {}", image);
        }
        println!(
            "  {} {} likes · {} comments{}",
            if post.is_liked { "♥" } else { "♡" },
            post.likes_count,
            post.comments_count,
            if feed.can_modify(post) {
                " · yours"
            } else {
                ""
            }
        );
    }
}
