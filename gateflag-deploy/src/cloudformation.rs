//! [`ControlPlane`] backed by the AWS CloudFormation API.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_cloudformation::config::Region;
use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cloudformation::types::{Capability, Parameter};
use aws_sdk_cloudformation::Client;
use gateflag_core::{OutputSet, ParameterSet, StackName, StackStatus};
use tracing::debug;

use crate::control_plane::{ControlPlane, StackDescription, StackRequest, CAPABILITIES};
use crate::error::ControlPlaneError;

const NOT_FOUND_MARKER: &str = "does not exist";
const NO_CHANGES_MARKER: &str = "No updates are to be performed";

/// Error codes the provider uses for requests that will never succeed as sent.
const REJECTION_CODES: &[&str] = &[
    "ValidationError",
    "InsufficientCapabilitiesException",
    "LimitExceededException",
    "TokenAlreadyExistsException",
];

/// CloudFormation client bound to one region.
#[derive(Debug, Clone)]
pub struct CloudFormation {
    client: Client,
}

impl CloudFormation {
    /// Build a client from the default credential chain for `region`.
    pub async fn connect(region: &str) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_owned()))
            .load()
            .await;
        Self::new(Client::new(&shared))
    }

    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn to_parameters(parameters: &ParameterSet) -> Vec<Parameter> {
    parameters
        .iter()
        .map(|(key, value)| {
            Parameter::builder()
                .parameter_key(key)
                .parameter_value(value)
                .build()
        })
        .collect()
}

fn to_capabilities() -> Vec<Capability> {
    CAPABILITIES.iter().map(|c| Capability::from(*c)).collect()
}

/// Sort an SDK failure into the trait's error vocabulary.
fn map_sdk_error<E, R>(
    operation: &'static str,
    stack: &StackName,
    err: SdkError<E, R>,
) -> ControlPlaneError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let (code, message) = match err.as_service_error() {
        Some(service) => (
            service.code().map(str::to_owned),
            service.message().map(str::to_owned),
        ),
        None => (None, None),
    };
    let message = message.unwrap_or_else(|| DisplayErrorContext(&err).to_string());
    let stack = stack.clone();

    match code.as_deref() {
        Some("ValidationError") if message.contains(NOT_FOUND_MARKER) => {
            ControlPlaneError::NotFound { stack }
        }
        Some("ValidationError") if message.contains(NO_CHANGES_MARKER) => {
            ControlPlaneError::NoChanges { stack }
        }
        Some("AlreadyExistsException") => ControlPlaneError::AlreadyExists { stack },
        Some(code) if REJECTION_CODES.contains(&code) => ControlPlaneError::Rejected {
            operation,
            stack,
            message,
        },
        _ => ControlPlaneError::Transport {
            operation,
            stack,
            message,
        },
    }
}

#[async_trait]
impl ControlPlane for CloudFormation {
    async fn describe_stack(&self, stack: &StackName) -> Result<StackDescription, ControlPlaneError> {
        let output = self
            .client
            .describe_stacks()
            .stack_name(stack.as_str())
            .send()
            .await
            .map_err(|err| map_sdk_error("DescribeStacks", stack, err))?;

        let found = output
            .stacks()
            .first()
            .ok_or_else(|| ControlPlaneError::NotFound { stack: stack.clone() })?;

        let status = found
            .stack_status()
            .map(|s| StackStatus::parse(s.as_str()))
            .unwrap_or_else(|| StackStatus::Unknown(String::new()));
        let parameters: ParameterSet = found
            .parameters()
            .iter()
            .filter_map(|p| {
                let key = p.parameter_key()?;
                Some((key.to_owned(), p.parameter_value().unwrap_or_default().to_owned()))
            })
            .collect();
        let outputs: OutputSet = found
            .outputs()
            .iter()
            .filter_map(|o| {
                let key = o.output_key()?;
                Some((key.to_owned(), o.output_value().unwrap_or_default().to_owned()))
            })
            .collect();

        debug!(stack = %stack, status = %status, "described stack");
        Ok(StackDescription {
            name: stack.clone(),
            status,
            status_reason: found.stack_status_reason().map(str::to_owned),
            parameters,
            outputs,
        })
    }

    async fn create_stack(&self, request: &StackRequest<'_>) -> Result<(), ControlPlaneError> {
        self.client
            .create_stack()
            .stack_name(request.name.as_str())
            .template_body(request.template_body)
            .set_parameters(Some(to_parameters(request.parameters)))
            .set_capabilities(Some(to_capabilities()))
            .send()
            .await
            .map_err(|err| map_sdk_error("CreateStack", request.name, err))?;
        Ok(())
    }

    async fn update_stack(&self, request: &StackRequest<'_>) -> Result<(), ControlPlaneError> {
        self.client
            .update_stack()
            .stack_name(request.name.as_str())
            .template_body(request.template_body)
            .set_parameters(Some(to_parameters(request.parameters)))
            .set_capabilities(Some(to_capabilities()))
            .send()
            .await
            .map_err(|err| map_sdk_error("UpdateStack", request.name, err))?;
        Ok(())
    }

    async fn delete_stack(&self, stack: &StackName) -> Result<(), ControlPlaneError> {
        self.client
            .delete_stack()
            .stack_name(stack.as_str())
            .send()
            .await
            .map_err(|err| map_sdk_error("DeleteStack", stack, err))?;
        Ok(())
    }

    async fn get_template(&self, stack: &StackName) -> Result<String, ControlPlaneError> {
        let output = self
            .client
            .get_template()
            .stack_name(stack.as_str())
            .send()
            .await
            .map_err(|err| map_sdk_error("GetTemplate", stack, err))?;
        output
            .template_body()
            .map(str::to_owned)
            .ok_or_else(|| ControlPlaneError::Rejected {
                operation: "GetTemplate",
                stack: stack.clone(),
                message: "response carried no template body".to_string(),
            })
    }
}
