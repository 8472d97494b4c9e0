use std::error::Error;

use clap::Subcommand;

use crate::core::store::LocalStore;
use crate::core::topics::{Topic, TopicCatalog, TopicCategory};

#[derive(Subcommand)]
pub enum TopicCommand {
    /// List topics, optionally for one category
    List {
        /// Emotional, Life, Career or Study (Chinese labels work too)
        #[arg(long, value_parser = parse_category)]
        category: Option<TopicCategory>,
    },
    /// Add a topic to favorites, or remove it if already saved
    Save {
        /// Topic id, e.g. t1
        id: String,
    },
    /// List favorite topics
    Saved,
    /// Show a topic with its opening questions
    Show {
        /// Topic id, e.g. t1
        id: String,
    },
    /// Start a chat about a topic with the first character in the roster
    Start {
        /// Topic id, e.g. t1
        id: String,
    },
}

fn parse_category(value: &str) -> Result<TopicCategory, String> {
    TopicCategory::parse(value).ok_or_else(|| {
        let known: Vec<&str> = TopicCategory::ALL.iter().map(|c| c.as_str()).collect();
        format!("unknown category: {value} (expected one of {})", known.join(", "))
    })
}

pub async fn run(store: &LocalStore, command: TopicCommand) -> Result<(), Box<dyn Error>> {
    let mut catalog = TopicCatalog::load(store)?;
    match command {
        TopicCommand::List { category } => {
            let topics = catalog.list(category);
            match category {
                Some(category) => println!("Topics in {category}:\n"),
                None => println!("Topics:\n"),
            }
            print_topics(&topics);
        }
        TopicCommand::Save { id } => {
            let Some(saved) = catalog.toggle_saved(&id) else {
                return Err(format!("No topic with id {id:?}").into());
            };
            catalog.save(store)?;
            if saved {
                println!("★ Saved {id}");
            } else {
                println!("☆ Removed {id} from favorites");
            }
        }
        TopicCommand::Saved => {
            let saved: Vec<&Topic> = catalog.saved().collect();
            if saved.is_empty() {
                println!("No saved topics.");
                println!("\n💡 Save one with:");
                println!("   heartline topics save <id>");
            } else {
                println!("Saved topics:\n");
                print_topics(&saved);
            }
        }
        TopicCommand::Show { id } => show(find(&catalog, &id)?),
        TopicCommand::Start { id } => {
            show(find(&catalog, &id)?);
            println!();
            return super::chat::run_chat(None, None).await;
        }
    }
    Ok(())
}

fn find<'a>(catalog: &'a TopicCatalog, id: &str) -> Result<&'a Topic, Box<dyn Error>> {
    catalog
        .get(id)
        .ok_or_else(|| format!("No topic with id {id:?}").into())
}

fn show(topic: &Topic) {
    let star = if topic.is_saved { " ★" } else { "" };
    println!("{} · {}{star}", topic.title, topic.category);
    println!("  {}", topic.description);
    println!("  tags: {}", topic.emotion_tags.join(", "));
    println!("\nTry opening with:");
    for question in &topic.starter_questions {
        println!("  • {question}");
    }
}

fn print_topics(topics: &[&Topic]) {
    for topic in topics {
        let star = if topic.is_saved { "★" } else { " " };
        println!(
            "  {star} {} [{}] {} ({})",
            topic.id,
            topic.category,
            topic.title,
            topic.emotion_tags.join("/")
        );
        println!("      {}", topic.description);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_flag_lists_choices_on_error() {
        assert_eq!(parse_category("Life"), Ok(TopicCategory::Life));
        let err = parse_category("hobby").unwrap_err();
        assert!(err.contains("Emotional, Life, Career, Study"));
    }

    #[tokio::test]
    async fn save_persists_toggle() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        run(&store, TopicCommand::Save { id: "t5".into() }).await.unwrap();
        assert!(TopicCatalog::load(&store).unwrap().get("t5").unwrap().is_saved);

        run(&store, TopicCommand::Save { id: "t5".into() }).await.unwrap();
        assert!(!TopicCatalog::load(&store).unwrap().get("t5").unwrap().is_saved);

        assert!(run(&store, TopicCommand::Save { id: "t9".into() }).await.is_err());
    }

    #[tokio::test]
    async fn show_rejects_unknown_topics() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        assert!(run(&store, TopicCommand::Show { id: "t1".into() }).await.is_ok());
        assert!(run(&store, TopicCommand::Show { id: "t0".into() }).await.is_err());
    }
}
