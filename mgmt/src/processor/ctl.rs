// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Control channel of the configuration manager

use config::records::ConfigAgentAccount;
use config::rpc::{
    ExecNsConfigPrimitiveInput, ExecNsConfigPrimitiveOutput, GetNsConfigPrimitiveValuesInput,
    GetNsConfigPrimitiveValuesOutput,
};
use config::status::CmState;
use config::{ConfigError, NsrId};
use tokio::sync::mpsc::Sender;
use tokio::sync::oneshot;
use tokio::sync::oneshot::Sender as AsyncSender;
#[allow(unused)]
use tracing::{debug, error, info, warn};

pub(crate) type CmReplyTx<T> = AsyncSender<Result<T, ConfigError>>;

pub enum CmCtlMsg {
    Finish,
    NsrRunning(NsrId, CmReplyTx<()>),
    NsrTerminate(NsrId, CmReplyTx<()>),
    AddAccount(ConfigAgentAccount, CmReplyTx<()>),
    DeleteAccount(String, CmReplyTx<()>),
    ExecNsConfigPrimitive(
        ExecNsConfigPrimitiveInput,
        CmReplyTx<ExecNsConfigPrimitiveOutput>,
    ),
    GetNsConfigPrimitiveValues(
        GetNsConfigPrimitiveValuesInput,
        CmReplyTx<GetNsConfigPrimitiveValuesOutput>,
    ),
    GetCmState(CmReplyTx<CmState>),
}

/// Reply to a request, if the requestor is still there
pub(crate) fn reply<T>(reply_to: CmReplyTx<T>, result: Result<T, ConfigError>) {
    if reply_to.send(result).is_err() {
        warn!("Requestor left before getting a reply");
    }
}

// An object to send control messages to the configuration manager
#[derive(Clone)]
pub struct CmCtlSender(Sender<CmCtlMsg>);
impl CmCtlSender {
    pub(crate) fn new(tx: Sender<CmCtlMsg>) -> Self {
        Self(tx)
    }

    async fn request<T>(
        &self,
        what: &'static str,
        build: impl FnOnce(CmReplyTx<T>) -> CmCtlMsg,
    ) -> Result<T, ConfigError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.0.send(build(reply_tx)).await.map_err(|_| {
            ConfigError::InternalFailure(format!("Failed to send {what} request"))
        })?;
        reply_rx
            .await
            .map_err(|_| ConfigError::InternalFailure(format!("Failed to receive {what} reply")))?
    }

    /// Signal that an NSR reached the running state
    pub async fn nsr_running(&self, id: NsrId) -> Result<(), ConfigError> {
        debug!("Requesting configuration of NSR {id}...");
        self.request("nsr-running", |tx| CmCtlMsg::NsrRunning(id, tx))
            .await
    }
    pub async fn nsr_terminate(&self, id: NsrId) -> Result<(), ConfigError> {
        debug!("Requesting termination of NSR {id}...");
        self.request("nsr-terminate", |tx| CmCtlMsg::NsrTerminate(id, tx))
            .await
    }
    pub async fn add_account(&self, account: ConfigAgentAccount) -> Result<(), ConfigError> {
        self.request("add-account", |tx| CmCtlMsg::AddAccount(account, tx))
            .await
    }
    pub async fn delete_account(&self, name: &str) -> Result<(), ConfigError> {
        let name = name.to_owned();
        self.request("delete-account", |tx| CmCtlMsg::DeleteAccount(name, tx))
            .await
    }
    pub async fn exec_ns_config_primitive(
        &self,
        input: ExecNsConfigPrimitiveInput,
    ) -> Result<ExecNsConfigPrimitiveOutput, ConfigError> {
        self.request("exec-ns-config-primitive", |tx| {
            CmCtlMsg::ExecNsConfigPrimitive(input, tx)
        })
        .await
    }
    pub async fn get_ns_config_primitive_values(
        &self,
        input: GetNsConfigPrimitiveValuesInput,
    ) -> Result<GetNsConfigPrimitiveValuesOutput, ConfigError> {
        self.request("get-ns-config-primitive-values", |tx| {
            CmCtlMsg::GetNsConfigPrimitiveValues(input, tx)
        })
        .await
    }
    pub async fn get_cm_state(&self) -> Result<CmState, ConfigError> {
        self.request("get-cm-state", CmCtlMsg::GetCmState).await
    }
    pub async fn finish(&self) -> Result<(), ConfigError> {
        self.0
            .send(CmCtlMsg::Finish)
            .await
            .map_err(|_| ConfigError::InternalFailure("Failed to send finish request".to_string()))
    }
    /// Request the configuration manager to stop, from outside of any runtime
    pub fn blocking_finish(&self) -> Result<(), ConfigError> {
        self.0
            .blocking_send(CmCtlMsg::Finish)
            .map_err(|_| ConfigError::InternalFailure("Failed to send finish request".to_string()))
    }
}
