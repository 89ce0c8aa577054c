mod api;
mod caption;
mod config;
mod post;
mod publish;
mod store;

use std::{error::Error, process::ExitCode};

use api::{gemini::GeminiClient, graph::GraphClient};
use caption::CaptionError;
use config::{Command, Config, DraftCommand};
use log::{error, info};
use post::display_posts;
use publish::{Outcome, PublishJob};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();
    config.init_logger();

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), Box<dyn Error>> {
    let mut store = config.open_store();
    let store_path = config.store().clone();

    match config.command {
        Command::Draft { action } => match action {
            DraftCommand::Create {
                title,
                image,
                caption,
            } => {
                let post = store.create(&title, &image, &caption)?;
                info!("Saved draft {}", post.id);
            }
            DraftCommand::List => display_posts(&store.list()?),
            DraftCommand::Reorder { ids } => {
                store.reorder(&ids)?;
                display_posts(&store.list()?);
            }
            DraftCommand::Publish { id } => {
                if store.mark_published(&id)? {
                    info!("Marked {} as published", id);
                }
            }
            DraftCommand::Export {
                dir,
                extension,
                overwrite,
            } => {
                info!("Exporting drafts to {}", dir.display());
                let posts = store.list()?;
                let summary = post::file::export(&posts, &dir, &extension, overwrite).await?;
                info!("{} written", summary.written);
                info!("{} skipped", summary.skipped);
            }
        },
        Command::ApiKey { key } => {
            store.set_api_key(&key)?;
            info!("API key saved to {}", store_path.display());
        }
        Command::Enhance(args) => {
            let key = store.api_key()?.ok_or(CaptionError::MissingApiKey)?;
            let client = GeminiClient::new(args.api_url, key, args.model);
            let enhanced = caption::enhance(&client, &args.image, args.caption.as_deref()).await?;

            info!("Suggested title: {}", enhanced.suggested_title);
            info!("");
            for line in enhanced.caption.lines() {
                info!("{}", line);
            }
        }
        Command::Publish(args) => {
            let token = args.token()?;
            let image_base_url = args.image_base_url()?;

            info!("Starting publish job");
            let client = GraphClient::new(&args.api_url, token);
            let job = PublishJob::new(client, &args.posts, &args.extension, image_base_url);
            match job.run().await? {
                Outcome::NothingToDo => info!("Nothing to publish"),
                Outcome::Published { path, media_id } => {
                    info!("Published {} as {}", path.display(), media_id)
                }
            }
        }
    }

    info!("All done!");
    Ok(())
}
