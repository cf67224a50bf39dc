//! Console demo for the cloudcrew resource-management agents.
//!
//! A numbered menu drives the different execution modes: one-shot prompts,
//! tool listings, a stateful chat session, the stepwise planner, a single
//! agent, and the full three-agent group chat.

use std::io::{self, BufRead, Write};
use std::process;
use std::sync::Arc;

use log::error;

use cloudcrew::chat_session::ChatSession;
use cloudcrew::client_wrapper::{ClientWrapper, Message, Role};
use cloudcrew::clients::AzureOpenAIClient;
use cloudcrew::config::AzureSettings;
use cloudcrew::crew;
use cloudcrew::planner::StepwisePlanner;
use cloudcrew::tool_protocol::ToolRegistry;
use cloudcrew::tools::{ArmClient, ResourceGraphQueryTool, ResourceTagTool};

const MENU: &str = "
Please select the option to execute:
1. One-shot prompt
2. Display available tools
3. Chat session with tools
4. Execute StepWise Planner
5. Single Agent Execution
6. Agent Group Chat Execution
7. Exit
";

const INVALID_SELECTION: &str = "Invalid option, please select a valid option from the menu..";

const ASSISTANT_INSTRUCTIONS: &str = "You are a Azure Resource Management Agent. You are \
responsible for managing Azure resources and responding to user queries. You must only reply to \
user queries related to Azure resources. For non Azure resource related queries, you must \
politely decline.";

#[tokio::main]
async fn main() {
    cloudcrew::init_logger();

    let settings = match AzureSettings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            error!("{}", err);
            eprintln!("Configuration error: {}", err);
            process::exit(1);
        }
    };

    let client: Arc<dyn ClientWrapper> = Arc::new(AzureOpenAIClient::new(&settings));
    let arm = Arc::new(ArmClient::new(
        settings.arm_token.clone().unwrap_or_default(),
    ));
    let tools = Arc::new(full_registry(arm.clone()));

    println!("This is a sample app to demonstrate tools, planners and agents over Azure resources.");
    println!("{}", MENU);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        let option = match next_line(&mut lines) {
            Some(option) => option,
            None => return,
        };

        match option.trim() {
            "1" => {
                if let Some(input) = ask_user_input(&mut lines) {
                    one_shot(&client, &input).await;
                }
            }
            "2" => display_tools(&tools),
            "3" => {
                if let Some(input) = ask_user_input(&mut lines) {
                    chat_with_tools(client.clone(), tools.clone(), &input).await;
                }
            }
            "4" => {
                if let Some(input) = ask_user_input(&mut lines) {
                    run_planner(client.clone(), tools.clone(), &input).await;
                }
            }
            "5" => {
                if let Some(input) = ask_user_input(&mut lines) {
                    single_agent(client.clone(), arm.clone(), &input).await;
                }
            }
            "6" => {
                if let Some(input) = ask_user_input(&mut lines) {
                    group_chat(client.clone(), arm.clone(), &input).await;
                }
            }
            "7" => {
                println!("Quitting the app");
                return;
            }
            _ => println!("{}", INVALID_SELECTION),
        }

        println!("{}", MENU);
    }
}

fn full_registry(arm: Arc<ArmClient>) -> ToolRegistry {
    let mut registry = ToolRegistry::empty();
    registry.register(Arc::new(ResourceGraphQueryTool::new(arm.clone())));
    registry.register(Arc::new(ResourceTagTool::new(arm)));
    registry
}

fn next_line(lines: &mut impl Iterator<Item = io::Result<String>>) -> Option<String> {
    io::stdout().flush().ok();
    match lines.next() {
        Some(Ok(line)) => Some(line),
        _ => None,
    }
}

fn ask_user_input(lines: &mut impl Iterator<Item = io::Result<String>>) -> Option<String> {
    println!("Enter your question here ...");
    next_line(lines).filter(|line| !line.trim().is_empty())
}

async fn one_shot(client: &Arc<dyn ClientWrapper>, input: &str) {
    let messages = [
        Message::system(ASSISTANT_INSTRUCTIONS),
        Message::user(input),
    ];
    match client.send_message(&messages).await {
        Ok(reply) => {
            println!("{}", reply.text());
            if let Some(usage) = client.get_last_usage().await {
                println!("Tokens used: {}", usage.total_tokens);
            }
        }
        Err(err) => eprintln!("Request failed: {}", err),
    }
}

fn display_tools(tools: &ToolRegistry) {
    let metadata = tools.list_tools();
    println!("Total tools: {}", metadata.len());
    for meta in metadata {
        println!("{}\t{}", meta.name, meta.description);
        for param in &meta.parameters {
            println!(
                "\tParameter: {} ({}required) - {}",
                param.name,
                if param.required { "" } else { "not " },
                param.description.as_deref().unwrap_or("no description")
            );
        }
    }
}

async fn chat_with_tools(client: Arc<dyn ClientWrapper>, tools: Arc<ToolRegistry>, input: &str) {
    let agent = cloudcrew::agent::Agent::new(
        "Assistant",
        "Azure resource management assistant",
        ASSISTANT_INSTRUCTIONS,
        client,
    )
    .with_tools(tools);
    let mut session = ChatSession::new(agent);

    match session.send_message(Role::User, input).await {
        Ok(reply) => {
            println!("{}", reply.content);
            println!("Tool calls made: {}", reply.tool_calls_made);
            println!("Session tokens: {}", session.token_usage().total_tokens);
        }
        Err(err) => eprintln!("Chat failed: {}", err),
    }
}

async fn run_planner(client: Arc<dyn ClientWrapper>, tools: Arc<ToolRegistry>, input: &str) {
    let planner = StepwisePlanner::new(client, tools);
    match planner.execute(input).await {
        Ok(outcome) => {
            for message in &outcome.transcript {
                println!("# {}: '{}'", message.role, message.content.to_prompt_text());
            }
            println!("Final Answer {}", outcome.final_answer);
            println!("Number of iteration {}", outcome.iterations);
            if outcome.cap_reached {
                println!("Planner stopped at the iteration cap.");
            }
        }
        Err(err) => eprintln!("Planner failed: {}", err),
    }
}

async fn single_agent(client: Arc<dyn ClientWrapper>, arm: Arc<ArmClient>, input: &str) {
    let agent = crew::query_executor(client, arm);
    match agent.respond(&[Message::user(input)]).await {
        Ok(reply) => println!("# assistant: {}", reply.content),
        Err(err) => eprintln!("Agent failed: {}", err),
    }
}

async fn group_chat(client: Arc<dyn ClientWrapper>, arm: Arc<ArmClient>, input: &str) {
    let mut chat = crew::build_group_chat(client, arm);
    println!("# user: '{}'", input);
    match chat.run(input).await {
        Ok(outcome) => {
            for message in &outcome.transcript {
                println!(
                    "# {} - {}: '{}'",
                    message.role,
                    message.author_name.as_deref().unwrap_or("*"),
                    message.content.to_prompt_text()
                );
            }
            println!("Turns taken: {} ({:?})", outcome.turns, outcome.reason);
        }
        Err(err) => eprintln!("Group chat failed: {}", err),
    }
}
