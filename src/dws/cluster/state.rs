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

use std::borrow::Cow;
use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tf_provider::map;
use tf_provider::schema::{Attribute, AttributeConstraint, AttributeType, Block, Description, Schema};
use tf_provider::value::{self, Value, ValueBool, ValueList, ValueMap, ValueNumber, ValueString};

use crate::utils::{
    assign_string, computed, flatten_tags_to_map, number_at, settle_unknowns, string_at,
    string_list_at, PathSearch, Timeouts, WithSchema, ID_ATTRIBUTE, REGION_ATTRIBUTE,
    TAGS_ATTRIBUTE, TIMEOUTS_BLOCK,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PublicIp<'a> {
    #[serde(borrow = "'a")]
    pub public_bind_type: ValueString<'a>,
    pub eip_id: ValueString<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Volume<'a> {
    #[serde(borrow = "'a", rename = "type")]
    pub volume_type: ValueString<'a>,
    pub capacity: ValueString<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Endpoint<'a> {
    #[serde(borrow = "'a")]
    pub connect_info: ValueString<'a>,
    pub jdbc_url: ValueString<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PublicEndpoint<'a> {
    #[serde(borrow = "'a")]
    pub public_connect_info: ValueString<'a>,
    pub jdbc_url: ValueString<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MaintainWindow<'a> {
    #[serde(borrow = "'a")]
    pub day: ValueString<'a>,
    pub start_time: ValueString<'a>,
    pub end_time: ValueString<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Elb<'a> {
    #[serde(borrow = "'a")]
    pub name: ValueString<'a>,
    pub id: ValueString<'a>,
    pub public_ip: ValueString<'a>,
    pub private_ip: ValueString<'a>,
    pub private_endpoint: ValueString<'a>,
    pub vpc_id: ValueString<'a>,
    pub private_ip_v6: ValueString<'a>,
}

/// State of a `huaweicloud_dws_cluster` resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ClusterState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub region: ValueString<'a>,
    pub name: ValueString<'a>,
    pub node_type: ValueString<'a>,
    pub number_of_node: ValueNumber,
    pub user_name: ValueString<'a>,
    pub user_pwd: ValueString<'a>,
    pub vpc_id: ValueString<'a>,
    pub network_id: ValueString<'a>,
    pub security_group_id: ValueString<'a>,
    pub availability_zone: ValueString<'a>,
    pub version: ValueString<'a>,
    pub number_of_cn: ValueNumber,
    pub port: ValueNumber,
    pub dss_pool_id: ValueString<'a>,
    pub enterprise_project_id: ValueString<'a>,
    pub kms_key_id: ValueString<'a>,
    pub public_ip: Value<PublicIp<'a>>,
    pub volume: Value<Volume<'a>>,
    pub tags: ValueMap<'a, ValueString<'a>>,
    pub keep_last_manual_snapshot: ValueNumber,
    pub logical_cluster_enable: ValueBool,
    pub elb_id: ValueString<'a>,
    pub lts_enable: ValueBool,
    pub description: ValueString<'a>,
    pub force_backup: ValueBool,
    pub status: ValueString<'a>,
    pub created: ValueString<'a>,
    pub updated: ValueString<'a>,
    pub endpoints: ValueList<Value<Endpoint<'a>>>,
    pub public_endpoints: ValueList<Value<PublicEndpoint<'a>>>,
    pub recent_event: ValueNumber,
    pub sub_status: ValueString<'a>,
    pub task_status: ValueString<'a>,
    pub private_ip: ValueList<ValueString<'a>>,
    pub maintain_window: ValueList<Value<MaintainWindow<'a>>>,
    pub elb: ValueList<Value<Elb<'a>>>,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<Timeouts<'a>>,
}

/// State of a `huaweicloud_dws_cluster` data source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ClusterDataState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub region: ValueString<'a>,
    pub cluster_id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub status: ValueString<'a>,
    pub version: ValueString<'a>,
    pub node_type: ValueString<'a>,
    pub number_of_node: ValueNumber,
    pub availability_zone: ValueString<'a>,
    pub vpc_id: ValueString<'a>,
    pub network_id: ValueString<'a>,
    pub security_group_id: ValueString<'a>,
    pub port: ValueNumber,
    pub user_name: ValueString<'a>,
    pub enterprise_project_id: ValueString<'a>,
    pub description: ValueString<'a>,
    pub public_ip: Value<PublicIp<'a>>,
    pub tags: ValueMap<'a, ValueString<'a>>,
    pub created: ValueString<'a>,
    pub updated: ValueString<'a>,
    pub endpoints: ValueList<Value<Endpoint<'a>>>,
    pub public_endpoints: ValueList<Value<PublicEndpoint<'a>>>,
    pub recent_event: ValueNumber,
    pub sub_status: ValueString<'a>,
    pub task_status: ValueString<'a>,
    pub private_ip: ValueList<ValueString<'a>>,
    pub maintain_window: ValueList<Value<MaintainWindow<'a>>>,
    pub elb: ValueList<Value<Elb<'a>>>,
}

fn owned<'a>(value: &str) -> ValueString<'a> {
    Value::Value(Cow::Owned(value.to_owned()))
}

pub(super) fn flatten_public_ip<'a>(body: &Json) -> Value<PublicIp<'a>> {
    match body.search("cluster.public_ip") {
        Some(public_ip @ Json::Object(_)) => Value::Value(PublicIp {
            public_bind_type: string_at(&public_ip, "public_bind_type"),
            eip_id: string_at(&public_ip, "eip_id"),
        }),
        _ => Value::Null,
    }
}

fn flatten_endpoints<'a>(body: &Json) -> ValueList<Value<Endpoint<'a>>> {
    Value::Value(
        body.search_array("cluster.endpoints")
            .iter()
            .map(|endpoint| {
                Value::Value(Endpoint {
                    connect_info: string_at(endpoint, "connect_info"),
                    jdbc_url: string_at(endpoint, "jdbc_url"),
                })
            })
            .collect(),
    )
}

fn flatten_public_endpoints<'a>(body: &Json) -> ValueList<Value<PublicEndpoint<'a>>> {
    Value::Value(
        body.search_array("cluster.public_endpoints")
            .iter()
            .map(|endpoint| {
                Value::Value(PublicEndpoint {
                    public_connect_info: string_at(endpoint, "public_connect_info"),
                    jdbc_url: string_at(endpoint, "jdbc_url"),
                })
            })
            .collect(),
    )
}

fn flatten_maintain_window<'a>(body: &Json) -> ValueList<Value<MaintainWindow<'a>>> {
    Value::Value(
        body.search("cluster.maintain_window")
            .filter(Json::is_object)
            .map(|window| {
                Value::Value(MaintainWindow {
                    day: string_at(&window, "day"),
                    start_time: string_at(&window, "start_time"),
                    end_time: string_at(&window, "end_time"),
                })
            })
            .into_iter()
            .collect(),
    )
}

fn flatten_elb<'a>(body: &Json) -> ValueList<Value<Elb<'a>>> {
    Value::Value(
        body.search("cluster.elb")
            .filter(Json::is_object)
            .map(|elb| {
                Value::Value(Elb {
                    name: string_at(&elb, "name"),
                    id: string_at(&elb, "id"),
                    public_ip: string_at(&elb, "public_ip"),
                    private_ip: string_at(&elb, "private_ip"),
                    private_endpoint: string_at(&elb, "private_endpoint"),
                    vpc_id: string_at(&elb, "vpc_id"),
                    private_ip_v6: string_at(&elb, "private_ip_v6"),
                })
            })
            .into_iter()
            .collect(),
    )
}

impl<'a> ClusterState<'a> {
    /// Mark every attribute computed by the API as unknown
    pub(super) fn unknown_outputs(&mut self) {
        self.status = Value::Unknown;
        self.updated = Value::Unknown;
        self.endpoints = Value::Unknown;
        self.public_endpoints = Value::Unknown;
        self.recent_event = Value::Unknown;
        self.sub_status = Value::Unknown;
        self.task_status = Value::Unknown;
        self.private_ip = Value::Unknown;
        self.maintain_window = Value::Unknown;
        self.elb = Value::Unknown;
    }

    /// Replace the unknowns the API did not resolve with nulls
    pub(super) fn settle(&mut self) {
        settle_unknowns!(
            self,
            [
                id,
                region,
                version,
                port,
                enterprise_project_id,
                public_ip,
                volume,
                tags,
                force_backup,
                status,
                created,
                updated,
                endpoints,
                public_endpoints,
                recent_event,
                sub_status,
                task_status,
                private_ip,
                maintain_window,
                elb,
            ]
        );
        if let Value::Value(public_ip) = &mut self.public_ip {
            settle_unknowns!(public_ip, [public_bind_type, eip_id]);
        }
        if let Value::Value(volume) = &mut self.volume {
            settle_unknowns!(volume, [volume_type, capacity]);
        }
    }

    /// Refresh the state from a cluster detail response
    ///
    /// Inputs the API never returns (password, storage pool, KMS key, ...)
    /// are left untouched.
    pub(super) fn apply_response(&mut self, region: &str, body: &Json) {
        self.region = owned(region);
        self.name = string_at(body, "cluster.name");
        self.status = string_at(body, "cluster.status");
        self.version = string_at(body, "cluster.version");
        self.created = string_at(body, "cluster.created");
        self.updated = string_at(body, "cluster.updated");
        self.port = number_at(body, "cluster.port");
        self.user_name = string_at(body, "cluster.user_name");
        self.number_of_node = number_at(body, "cluster.number_of_node");
        self.availability_zone = string_at(body, "cluster.availability_zone");
        self.enterprise_project_id = string_at(body, "cluster.enterprise_project_id");
        self.node_type = string_at(body, "cluster.node_type");
        self.vpc_id = string_at(body, "cluster.vpc_id");
        self.network_id = string_at(body, "cluster.subnet_id");
        self.security_group_id = string_at(body, "cluster.security_group_id");
        self.sub_status = string_at(body, "cluster.sub_status");
        self.task_status = string_at(body, "cluster.task_status");
        self.recent_event = number_at(body, "cluster.recent_event");
        self.private_ip = string_list_at(body, "cluster.private_ip");
        self.endpoints = flatten_endpoints(body);
        self.public_endpoints = flatten_public_endpoints(body);
        self.maintain_window = flatten_maintain_window(body);
        self.elb = flatten_elb(body);
        assign_string(
            &mut self.description,
            string_at(body, "cluster.cluster_description_info"),
        );

        let tags = flatten_tags_to_map(body.search("cluster.tags"));
        let empty_tags = self.tags.as_ref_option().is_some_and(|tags| tags.is_empty());
        if !(tags.is_null() && empty_tags) {
            self.tags = tags;
        }

        let public_ip = flatten_public_ip(body);
        if public_ip.is_value() || self.public_ip.is_unknown() {
            self.public_ip = public_ip;
        }

        if let Some(volume) = body.search("cluster.volume").filter(Json::is_object) {
            self.volume = Value::Value(Volume {
                volume_type: string_at(&volume, "type"),
                capacity: string_at(&volume, "capacity"),
            });
        }
    }
}

impl<'a> ClusterDataState<'a> {
    pub(super) fn apply_response(&mut self, region: &str, body: &Json) {
        self.id = string_at(body, "cluster.id");
        self.region = owned(region);
        self.name = string_at(body, "cluster.name");
        self.status = string_at(body, "cluster.status");
        self.version = string_at(body, "cluster.version");
        self.node_type = string_at(body, "cluster.node_type");
        self.number_of_node = number_at(body, "cluster.number_of_node");
        self.availability_zone = string_at(body, "cluster.availability_zone");
        self.vpc_id = string_at(body, "cluster.vpc_id");
        self.network_id = string_at(body, "cluster.subnet_id");
        self.security_group_id = string_at(body, "cluster.security_group_id");
        self.port = number_at(body, "cluster.port");
        self.user_name = string_at(body, "cluster.user_name");
        self.enterprise_project_id = string_at(body, "cluster.enterprise_project_id");
        self.description = string_at(body, "cluster.cluster_description_info");
        self.public_ip = flatten_public_ip(body);
        self.tags = flatten_tags_to_map(body.search("cluster.tags"));
        self.created = string_at(body, "cluster.created");
        self.updated = string_at(body, "cluster.updated");
        self.endpoints = flatten_endpoints(body);
        self.public_endpoints = flatten_public_endpoints(body);
        self.recent_event = number_at(body, "cluster.recent_event");
        self.sub_status = string_at(body, "cluster.sub_status");
        self.task_status = string_at(body, "cluster.task_status");
        self.private_ip = string_list_at(body, "cluster.private_ip");
        self.maintain_window = flatten_maintain_window(body);
        self.elb = flatten_elb(body);
    }
}

fn public_ip_attributes(constraint: AttributeConstraint) -> HashMap<String, Attribute> {
    map! {
        "public_bind_type" => Attribute {
            attr_type: AttributeType::String,
            description: Description::plain("The bind type of public IP."),
            constraint: constraint.clone(),
            ..Default::default()
        },
        "eip_id" => Attribute {
            attr_type: AttributeType::String,
            description: Description::plain("The EIP ID."),
            constraint,
            ..Default::default()
        },
    }
}

lazy_static! {
    static ref ENDPOINTS_ATTRIBUTE: Attribute = computed(
        AttributeType::AttributeList(map! {
            "connect_info" => computed(AttributeType::String, "Private network connection information."),
            "jdbc_url" => computed(
                AttributeType::String,
                "JDBC URL. Format: jdbc:postgresql://<connect_info>/<YOUR_DATABASE_NAME>",
            ),
        }),
        "Private network connection information about the cluster.",
    );
    static ref PUBLIC_ENDPOINTS_ATTRIBUTE: Attribute = computed(
        AttributeType::AttributeList(map! {
            "public_connect_info" => computed(AttributeType::String, "Public network connection information."),
            "jdbc_url" => computed(
                AttributeType::String,
                "JDBC URL. Format: jdbc:postgresql://<public_connect_info>/<YOUR_DATABASE_NAME>",
            ),
        }),
        "Public network connection information about the cluster.",
    );
    static ref MAINTAIN_WINDOW_ATTRIBUTE: Attribute = computed(
        AttributeType::AttributeList(map! {
            "day" => computed(AttributeType::String, "Maintenance time in each week in the unit of day."),
            "start_time" => computed(AttributeType::String, "Maintenance start time in HH:mm format. The time zone is GMT+0."),
            "end_time" => computed(AttributeType::String, "Maintenance end time in HH:mm format. The time zone is GMT+0."),
        }),
        "Cluster maintenance window.",
    );
    static ref ELB_ATTRIBUTE: Attribute = computed(
        AttributeType::AttributeList(map! {
            "name" => computed(AttributeType::String, "The name of the ELB load balancer."),
            "id" => computed(AttributeType::String, "The ID of the ELB load balancer."),
            "public_ip" => computed(AttributeType::String, "The IP address of the ELB load balancer."),
            "private_ip" => computed(AttributeType::String, "The private IP address of the ELB load balancer."),
            "private_endpoint" => computed(AttributeType::String, "The private endpoint of the ELB load balancer."),
            "vpc_id" => computed(AttributeType::String, "The ID of VPC to which the ELB load balancer belongs."),
            "private_ip_v6" => computed(AttributeType::String, "The IPv6 address of the ELB load balancer."),
        }),
        "The ELB information bound to the cluster.",
    );
    static ref PRIVATE_IP_ATTRIBUTE: Attribute = computed(
        AttributeType::List(AttributeType::String.into()),
        "List of private network IP addresses.",
    );
}

/// Attributes shared by the resource and the data source, all computed
fn output_attributes() -> HashMap<String, Attribute> {
    map! {
        "status" => computed(AttributeType::String, "The cluster status."),
        "created" => computed(AttributeType::String, "The creation time of the cluster."),
        "updated" => computed(AttributeType::String, "The updated time of the cluster."),
        "endpoints" => ENDPOINTS_ATTRIBUTE.clone(),
        "public_endpoints" => PUBLIC_ENDPOINTS_ATTRIBUTE.clone(),
        "recent_event" => computed(AttributeType::Number, "The recent event number."),
        "sub_status" => computed(AttributeType::String, "Sub-status of clusters in the AVAILABLE state."),
        "task_status" => computed(AttributeType::String, "Cluster management task."),
        "private_ip" => PRIVATE_IP_ATTRIBUTE.clone(),
        "maintain_window" => MAINTAIN_WINDOW_ATTRIBUTE.clone(),
        "elb" => ELB_ATTRIBUTE.clone(),
    }
}

impl WithSchema for ClusterState<'_> {
    fn schema() -> Schema {
        let mut attributes: HashMap<String, Attribute> = map! {
            "id" => ID_ATTRIBUTE.clone(),
            "region" => REGION_ATTRIBUTE.clone(),
            "name" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("The cluster name."),
                constraint: AttributeConstraint::Required,
                ..Default::default()
            },
            "node_type" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("The flavor of the cluster."),
                constraint: AttributeConstraint::Required,
                ..Default::default()
            },
            "number_of_node" => Attribute {
                attr_type: AttributeType::Number,
                description: Description::plain("Number of nodes in a cluster."),
                constraint: AttributeConstraint::Required,
                ..Default::default()
            },
            "user_name" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain(
                    "Administrator username for logging in to a data warehouse cluster.",
                ),
                constraint: AttributeConstraint::Required,
                ..Default::default()
            },
            "user_pwd" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain(
                    "Administrator password for logging in to a data warehouse cluster.",
                ),
                constraint: AttributeConstraint::Required,
                sensitive: true,
                ..Default::default()
            },
            "vpc_id" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("The VPC ID."),
                constraint: AttributeConstraint::Required,
                ..Default::default()
            },
            "network_id" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("The subnet ID."),
                constraint: AttributeConstraint::Required,
                ..Default::default()
            },
            "security_group_id" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("The security group ID."),
                constraint: AttributeConstraint::Required,
                ..Default::default()
            },
            "availability_zone" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain(
                    "The availability zone in which to create the cluster instance.",
                ),
                constraint: AttributeConstraint::Required,
                ..Default::default()
            },
            "version" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("The cluster version."),
                constraint: AttributeConstraint::OptionalComputed,
                ..Default::default()
            },
            "number_of_cn" => Attribute {
                attr_type: AttributeType::Number,
                description: Description::plain("The number of CN."),
                constraint: AttributeConstraint::Optional,
                ..Default::default()
            },
            "port" => Attribute {
                attr_type: AttributeType::Number,
                description: Description::plain(
                    "Service port of a cluster (8000 to 10000). The default value is 8000.",
                ),
                constraint: AttributeConstraint::OptionalComputed,
                ..Default::default()
            },
            "dss_pool_id" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("Dedicated storage pool ID."),
                constraint: AttributeConstraint::Optional,
                ..Default::default()
            },
            "enterprise_project_id" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("The enterprise project ID."),
                constraint: AttributeConstraint::OptionalComputed,
                ..Default::default()
            },
            "kms_key_id" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("The KMS key ID."),
                constraint: AttributeConstraint::Optional,
                ..Default::default()
            },
            "public_ip" => Attribute {
                attr_type: AttributeType::AttributeSingle(public_ip_attributes(
                    AttributeConstraint::OptionalComputed,
                )),
                description: Description::plain("The information about public IP."),
                constraint: AttributeConstraint::OptionalComputed,
                ..Default::default()
            },
            "volume" => Attribute {
                attr_type: AttributeType::AttributeSingle(map! {
                    "type" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("The volume type."),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "capacity" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("The capacity size, in GB."),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                }),
                description: Description::plain("The information about the volume."),
                constraint: AttributeConstraint::OptionalComputed,
                ..Default::default()
            },
            "tags" => TAGS_ATTRIBUTE.clone(),
            "keep_last_manual_snapshot" => Attribute {
                attr_type: AttributeType::Number,
                description: Description::plain(
                    "The number of latest manual snapshots that need to be retained when deleting the cluster.",
                ),
                constraint: AttributeConstraint::Optional,
                ..Default::default()
            },
            "logical_cluster_enable" => Attribute {
                attr_type: AttributeType::Bool,
                description: Description::plain("Whether to enable logical cluster."),
                constraint: AttributeConstraint::Optional,
                ..Default::default()
            },
            "elb_id" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("The ID of the ELB load balancer."),
                constraint: AttributeConstraint::Optional,
                ..Default::default()
            },
            "lts_enable" => Attribute {
                attr_type: AttributeType::Bool,
                description: Description::plain("Whether to enable LTS."),
                constraint: AttributeConstraint::Optional,
                ..Default::default()
            },
            "description" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("The description of the cluster."),
                constraint: AttributeConstraint::Optional,
                ..Default::default()
            },
            "force_backup" => Attribute {
                attr_type: AttributeType::Bool,
                description: Description::plain(
                    "Whether to automatically execute snapshot when shrinking the number of nodes.",
                ),
                constraint: AttributeConstraint::OptionalComputed,
                ..Default::default()
            },
        };
        attributes.extend(output_attributes());

        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes,
                blocks: map! {
                    "timeouts" => TIMEOUTS_BLOCK.clone(),
                },
                description: Description::plain("Manages a GaussDB(DWS) cluster"),
                ..Default::default()
            },
        }
    }
}

impl WithSchema for ClusterDataState<'_> {
    fn schema() -> Schema {
        let mut attributes: HashMap<String, Attribute> = map! {
            "id" => ID_ATTRIBUTE.clone(),
            "region" => REGION_ATTRIBUTE.clone(),
            "cluster_id" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("The ID of the cluster to query."),
                constraint: AttributeConstraint::Required,
                ..Default::default()
            },
            "name" => computed(AttributeType::String, "The cluster name."),
            "version" => computed(AttributeType::String, "The cluster version."),
            "node_type" => computed(AttributeType::String, "The flavor of the cluster."),
            "number_of_node" => computed(AttributeType::Number, "Number of nodes in a cluster."),
            "availability_zone" => computed(AttributeType::String, "The availability zone of the cluster."),
            "vpc_id" => computed(AttributeType::String, "The VPC ID."),
            "network_id" => computed(AttributeType::String, "The subnet ID."),
            "security_group_id" => computed(AttributeType::String, "The security group ID."),
            "port" => computed(AttributeType::Number, "Service port of the cluster."),
            "user_name" => computed(AttributeType::String, "Administrator username of the cluster."),
            "enterprise_project_id" => computed(AttributeType::String, "The enterprise project ID."),
            "description" => computed(AttributeType::String, "The description of the cluster."),
            "public_ip" => computed(
                AttributeType::AttributeSingle(public_ip_attributes(AttributeConstraint::Computed)),
                "The information about public IP.",
            ),
            "tags" => computed(
                AttributeType::Map(AttributeType::String.into()),
                "The key/value pairs associated with the cluster.",
            ),
        };
        attributes.extend(output_attributes());

        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes,
                description: Description::plain("Get the details of a GaussDB(DWS) cluster"),
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn cluster() -> Json {
        json!({
            "cluster": {
                "id": "c-1",
                "name": "dws-demo",
                "status": "AVAILABLE",
                "version": "8.1.3.110",
                "port": 8000,
                "user_name": "dbadmin",
                "number_of_node": 3,
                "availability_zone": "cn-north-4a",
                "node_type": "dws2.m6.4xlarge.8",
                "vpc_id": "vpc-1",
                "subnet_id": "subnet-1",
                "security_group_id": "sg-1",
                "task_status": "",
                "recent_event": 2,
                "private_ip": ["192.168.0.10", "192.168.0.11"],
                "endpoints": [
                    {"connect_info": "192.168.0.10:8000", "jdbc_url": "jdbc:postgresql://192.168.0.10:8000/"}
                ],
                "public_endpoints": [],
                "public_ip": {"public_bind_type": "auto_assign", "eip_id": "eip-1"},
                "maintain_window": {"day": "Thu", "start_time": "22:00", "end_time": "02:00"},
                "tags": [{"key": "env", "value": "test"}],
                "cluster_description_info": "",
                "volume": {"type": "SSD", "capacity": 300}
            }
        })
    }

    #[test]
    fn test_apply_response() {
        let mut state = ClusterState {
            user_pwd: Value::Value(Cow::Borrowed("secret")),
            public_ip: Value::Unknown,
            ..Default::default()
        };
        state.apply_response("cn-north-4", &cluster());

        assert_eq!(state.region.as_deref_option(), Some("cn-north-4"));
        assert_eq!(state.name.as_deref_option(), Some("dws-demo"));
        assert_eq!(state.network_id.as_deref_option(), Some("subnet-1"));
        assert_eq!(state.number_of_node.as_option(), Some(3));
        assert_eq!(state.user_pwd.as_deref_option(), Some("secret"));
        assert!(state.description.is_null());
        assert_eq!(state.private_ip.iter().flatten().count(), 2);
        assert_eq!(
            state.public_ip.as_ref_option().and_then(|ip| ip.eip_id.as_deref_option()),
            Some("eip-1")
        );
        assert_eq!(
            state.volume.as_ref_option().and_then(|v| v.capacity.as_deref_option()),
            Some("300")
        );
        let windows = state.maintain_window.as_ref_option().cloned().unwrap_or_default();
        assert_eq!(windows.len(), 1);
        assert!(state.elb.as_ref_option().is_some_and(Vec::is_empty));
        assert_eq!(
            state
                .tags
                .as_ref_option()
                .and_then(|tags| tags.get("env"))
                .and_then(|value| value.as_deref_option()),
            Some("test")
        );
    }

    #[test]
    fn test_apply_response_keeps_empty_tags() {
        let mut body = cluster();
        body["cluster"]["tags"] = json!([]);
        let mut state = ClusterState {
            tags: Value::Value(Default::default()),
            ..Default::default()
        };
        state.apply_response("cn-north-4", &body);
        assert!(state.tags.as_ref_option().is_some_and(|tags| tags.is_empty()));
    }

    #[test]
    fn test_settle() {
        let mut state = ClusterState {
            status: Value::Unknown,
            port: Value::Value(8000),
            public_ip: Value::Value(PublicIp {
                public_bind_type: Value::Value(Cow::Borrowed("not_use")),
                eip_id: Value::Unknown,
            }),
            volume: Value::Unknown,
            ..Default::default()
        };
        state.settle();
        assert!(state.status.is_null());
        assert!(state.volume.is_null());
        assert_eq!(state.port.as_option(), Some(8000));
        assert!(state
            .public_ip
            .as_ref_option()
            .is_some_and(|ip| ip.eip_id.is_null() && ip.public_bind_type.is_value()));
    }

    #[test]
    fn test_data_source_apply_response() {
        let mut state = ClusterDataState::default();
        state.apply_response("cn-north-4", &cluster());
        assert_eq!(state.id.as_deref_option(), Some("c-1"));
        assert_eq!(state.port.as_option(), Some(8000));
        assert_eq!(state.description.as_deref_option(), Some(""));
        assert_eq!(state.endpoints.iter().flatten().count(), 1);
    }

    #[test]
    fn test_schemas() {
        let schema = ClusterState::schema();
        assert!(schema.block.attributes["user_pwd"].sensitive);
        assert!(schema.block.blocks.contains_key("timeouts"));
        assert_eq!(
            schema.block.attributes["elb"].constraint,
            AttributeConstraint::Computed
        );

        let schema = ClusterDataState::schema();
        assert_eq!(
            schema.block.attributes["cluster_id"].constraint,
            AttributeConstraint::Required
        );
        assert!(schema.block.attributes.contains_key("maintain_window"));
    }
}
