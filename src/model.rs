// This file is part of the terraform-provider-huaweicloud project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Status values reported by the remote APIs

use std::fmt::Display;

use serde::{Deserialize, Serialize};

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)*
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $value,)*
                    Self::Other(value) => value,
                }
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                match value {
                    $($value => Self::$variant,)*
                    other => Self::Other(other.to_owned()),
                }
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::from(value.as_str())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_owned()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum! {
    /// Status of a DWS cluster
    ClusterStatus {
        Available => "AVAILABLE",
        Active => "ACTIVE",
        Creating => "CREATING",
        Unavailable => "UNAVAILABLE",
        Failed => "FAILED",
        CreateFailed => "CREATE_FAILED",
        CreationFailed => "CREATION FAILED",
        Deleting => "DELETING",
        Deleted => "DELETED",
        DeleteFailed => "DELETE_FAILED",
        Frozen => "FROZEN",
    }
}

impl ClusterStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Available | Self::Active)
    }

    /// Failures that end a creation or an update
    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            Self::Failed | Self::CreateFailed | Self::CreationFailed
        )
    }

    /// Failures that end a deletion
    pub fn is_delete_failed(&self) -> bool {
        matches!(self, Self::Failed | Self::DeleteFailed | Self::Frozen)
    }
}

string_enum! {
    /// Status of an asynchronous DWS job
    JobStatus {
        Init => "INIT",
        Running => "RUNNING",
        Success => "SUCCESS",
        Fail => "FAIL",
        Error => "ERROR",
    }
}

impl JobStatus {
    pub fn is_ready(&self) -> bool {
        *self == Self::Success
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Fail | Self::Error)
    }
}

string_enum! {
    /// Status of a DWS disaster recovery task
    DisasterRecoveryStatus {
        Unstart => "unstart",
        Creating => "creating",
        Starting => "starting",
        Running => "running",
        Stopping => "stopping",
        Stopped => "stopped",
        Switchovering => "switchovering",
        CreateFailed => "create_failed",
        StartFailed => "start_failed",
        StopFailed => "stop_failed",
        Abnormal => "abnormal",
    }
}

impl DisasterRecoveryStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            Self::CreateFailed | Self::StartFailed | Self::StopFailed | Self::Abnormal
        )
    }
}

string_enum! {
    /// Status of a LakeFormation instance
    InstanceStatus {
        Creating => "CREATING",
        Running => "RUNNING",
        Scaling => "SCALING",
        Deleting => "DELETING",
        ResourcePreparationFail => "RESOURCE_PREPARATION_FAIL",
        ScaleFail => "SCALE_FAIL",
    }
}

impl InstanceStatus {
    pub fn is_ready(&self) -> bool {
        *self == Self::Running
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::ResourcePreparationFail | Self::ScaleFail)
    }
}
