//! The stock resource-management crew.
//!
//! Assembles the three-agent group chat used by the console app: a
//! coordinator that owns the conversation with the user, a query specialist
//! that runs Resource Graph queries, and a tagging specialist that applies
//! tags. The coordinator is also the termination approver; the conversation
//! ends when it states [`GOAL_SENTINEL`].

use std::sync::Arc;

use crate::cloudcrew::agent::Agent;
use crate::cloudcrew::client_wrapper::ClientWrapper;
use crate::cloudcrew::group_chat::GroupChatSession;
use crate::cloudcrew::selection::SpeakerSelector;
use crate::cloudcrew::termination::TerminationChecker;
use crate::cloudcrew::tool_protocol::ToolRegistry;
use crate::cloudcrew::tools::{ArmClient, ResourceGraphQueryTool, ResourceTagTool};

/// Phrase the coordinator states to end a conversation.
pub const GOAL_SENTINEL: &str = "GOAL_IS_ACHIEVED";

pub const QUERY_EXECUTOR_NAME: &str = "QueryExecutor";
pub const QUERY_EXECUTOR_DESCRIPTION: &str =
    "Create and Execute Azure Resource Graph query to get resource information.";
pub const QUERY_EXECUTOR_INSTRUCTIONS: &str = "You are an expert in generating azure resource \
graph query and execution of the query. Dont ask user for additional input as you have \
sufficient permission to create and execute the resource graph query. You reply back with the \
result of the query execution along with resourceids.";

pub const REQUEST_COORDINATOR_NAME: &str = "RequestCoordinator";
pub const REQUEST_COORDINATOR_DESCRIPTION: &str =
    "Coordinate between QueryExecutor and ResourceTagger agents to achieve user goal.";
pub const REQUEST_COORDINATOR_INSTRUCTIONS: &str = "\
You are a Coordinator responsible to handle only azure resource specific queries.
You are capable to handle information query and tagging of azure resources.
For the provided user query you must first check is the query is for resource information or tagging of the resource.
You answer only to queries related to Azure resources with help of QueryExecutor and ResourceTagger Agents whereever applicable.
You are responsible for coordinating between QueryExecutor and ResourceTagger agents replies to achieve user goal.
If not tags are provided, you must ask the user to provide the tags and end the conversation.
You must always check if the user query is related to Azure resources. If not, you must politely decline.
If no appropiate Agents can be found, let the user know you only provide responses using Agents.
Finally you must end the conversation by stating  including phrase \"GOAL_IS_ACHIEVED\".";

pub const RESOURCE_TAGGER_NAME: &str = "ResourceTagger";
pub const RESOURCE_TAGGER_DESCRIPTION: &str =
    "Add tags to an azure resource based on resourceid and provided key and value.";
pub const RESOURCE_TAGGER_INSTRUCTIONS: &str = "You are expert in tagging azure resources.Your \
goal is to tag azure resource with provided key and value. You must always check if resourceid \
and tag the resource are provided in the user request. If not ask the RequestCoordinatorAgent to \
confirm the resourceid of the resource to be tagged by providing required details to be queried.";

/// Selection instructions for the stock crew.
pub fn selection_instructions() -> String {
    SpeakerSelector::build_instructions(
        &[
            RESOURCE_TAGGER_NAME,
            QUERY_EXECUTOR_NAME,
            REQUEST_COORDINATOR_NAME,
        ],
        &[
            "After user input, it is RequestCoordinator turn.",
            "After RequestCoordinator if additional information is required for tagging, its QueryExecutor's turn.",
            "After ResourceTagger if requires additional information for tagging, its QueryExecutor's turn.",
            "After ResourceTagger completes tagging request successfully, it is RequestCoordinator's turn.",
            "After QueryExecutor completes the query execution and there is no requirement for tagging a resource from user input, it is RequestCoordinator's turn.",
        ],
    )
}

/// Build the query-specialist agent with its Resource Graph tool.
pub fn query_executor(client: Arc<dyn ClientWrapper>, arm: Arc<ArmClient>) -> Agent {
    let mut registry = ToolRegistry::empty();
    registry.register(Arc::new(ResourceGraphQueryTool::new(arm)));
    Agent::new(
        QUERY_EXECUTOR_NAME,
        QUERY_EXECUTOR_DESCRIPTION,
        QUERY_EXECUTOR_INSTRUCTIONS,
        client,
    )
    .with_tools(Arc::new(registry))
}

/// Build the tagging-specialist agent with its tagging tool.
pub fn resource_tagger(client: Arc<dyn ClientWrapper>, arm: Arc<ArmClient>) -> Agent {
    let mut registry = ToolRegistry::empty();
    registry.register(Arc::new(ResourceTagTool::new(arm)));
    Agent::new(
        RESOURCE_TAGGER_NAME,
        RESOURCE_TAGGER_DESCRIPTION,
        RESOURCE_TAGGER_INSTRUCTIONS,
        client,
    )
    .with_tools(Arc::new(registry))
}

/// Build the coordinating agent. It carries no tools; its job is routing
/// and declaring the goal achieved.
pub fn request_coordinator(client: Arc<dyn ClientWrapper>) -> Agent {
    Agent::new(
        REQUEST_COORDINATOR_NAME,
        REQUEST_COORDINATOR_DESCRIPTION,
        REQUEST_COORDINATOR_INSTRUCTIONS,
        client,
    )
}

/// Assemble the full resource-management group chat.
///
/// All three agents and the speaker selector share the same chat client;
/// the two specialist agents share the same ARM client.
pub fn build_group_chat(client: Arc<dyn ClientWrapper>, arm: Arc<ArmClient>) -> GroupChatSession {
    let participants = vec![
        query_executor(client.clone(), arm.clone()),
        resource_tagger(client.clone(), arm),
        request_coordinator(client.clone()),
    ];

    let selector = SpeakerSelector::new(
        client,
        selection_instructions(),
        REQUEST_COORDINATOR_NAME,
    );

    let termination = TerminationChecker::new(GOAL_SENTINEL, [REQUEST_COORDINATOR_NAME])
        .with_auto_reset();

    GroupChatSession::new(participants, selector, termination)
}
