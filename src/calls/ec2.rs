use anyhow::Result;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ec2 as ec2;
use serde_json::{json, Map as JsonMap, Value};

use super::ApiCall;

fn tags_value(tags: &[ec2::types::Tag]) -> Value {
    Value::Array(
        tags.iter()
            .filter_map(|t| {
                let k = t.key()?;
                let v = t.value()?;
                Some(json!({"Key": k, "Value": v}))
            })
            .collect(),
    )
}

/// Instances are flattened out of their reservation envelopes so each
/// instance is one result item.
pub struct DescribeInstances;

#[async_trait]
impl ApiCall for DescribeInstances {
    async fn fetch_pages(&self, conf: &SdkConfig) -> Result<Vec<Value>> {
        let client = ec2::Client::new(conf);
        let mut pages = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut req = client.describe_instances();
            if let Some(t) = token.as_deref() {
                req = req.next_token(t);
            }
            let resp = req.send().await?;

            let mut items = Vec::new();
            for res in resp.reservations() {
                for inst in res.instances() {
                    let mut m = JsonMap::new();
                    if let Some(id) = inst.instance_id() {
                        m.insert("InstanceId".into(), json!(id));
                    }
                    if let Some(it) = inst.instance_type() {
                        m.insert("InstanceType".into(), json!(it.as_str()));
                    }
                    if let Some(st) = inst.state() {
                        let mut state = JsonMap::new();
                        if let Some(code) = st.code() {
                            state.insert("Code".into(), json!(code));
                        }
                        if let Some(name) = st.name() {
                            state.insert("Name".into(), json!(name.as_str()));
                        }
                        m.insert("State".into(), Value::Object(state));
                    }
                    if let Some(ip) = inst.private_ip_address() {
                        m.insert("PrivateIpAddress".into(), json!(ip));
                    }
                    if let Some(ip) = inst.public_ip_address() {
                        m.insert("PublicIpAddress".into(), json!(ip));
                    }
                    if let Some(vpc) = inst.vpc_id() {
                        m.insert("VpcId".into(), json!(vpc));
                    }
                    if let Some(subnet) = inst.subnet_id() {
                        m.insert("SubnetId".into(), json!(subnet));
                    }
                    if let Some(lt) = inst.launch_time() {
                        m.insert("LaunchTime".into(), json!(lt.secs()));
                    }
                    if !inst.tags().is_empty() {
                        m.insert("Tags".into(), tags_value(inst.tags()));
                    }
                    items.push(Value::Object(m));
                }
            }
            pages.push(json!({ "Instances": items }));

            token = resp.next_token().map(str::to_string);
            if token.is_none() {
                break;
            }
        }
        Ok(pages)
    }
}

pub struct DescribeVolumes;

#[async_trait]
impl ApiCall for DescribeVolumes {
    async fn fetch_pages(&self, conf: &SdkConfig) -> Result<Vec<Value>> {
        let client = ec2::Client::new(conf);
        let mut pages = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut req = client.describe_volumes();
            if let Some(t) = token.as_deref() {
                req = req.next_token(t);
            }
            let resp = req.send().await?;

            let mut items = Vec::new();
            for vol in resp.volumes() {
                let mut m = JsonMap::new();
                if let Some(id) = vol.volume_id() {
                    m.insert("VolumeId".into(), json!(id));
                }
                if let Some(st) = vol.state() {
                    m.insert("State".into(), json!(st.as_str()));
                }
                if let Some(vt) = vol.volume_type() {
                    m.insert("VolumeType".into(), json!(vt.as_str()));
                }
                m.insert("Size".into(), json!(vol.size()));
                m.insert("Encrypted".into(), json!(vol.encrypted()));
                if let Some(az) = vol.availability_zone() {
                    m.insert("AvailabilityZone".into(), json!(az));
                }
                if !vol.tags().is_empty() {
                    m.insert("Tags".into(), tags_value(vol.tags()));
                }
                items.push(Value::Object(m));
            }
            pages.push(json!({ "Volumes": items }));

            token = resp.next_token().map(str::to_string);
            if token.is_none() {
                break;
            }
        }
        Ok(pages)
    }
}

pub struct DescribeVpcs;

#[async_trait]
impl ApiCall for DescribeVpcs {
    async fn fetch_pages(&self, conf: &SdkConfig) -> Result<Vec<Value>> {
        let client = ec2::Client::new(conf);
        let mut pages = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut req = client.describe_vpcs();
            if let Some(t) = token.as_deref() {
                req = req.next_token(t);
            }
            let resp = req.send().await?;

            let mut items = Vec::new();
            for vpc in resp.vpcs() {
                let mut m = JsonMap::new();
                if let Some(id) = vpc.vpc_id() {
                    m.insert("VpcId".into(), json!(id));
                }
                if let Some(st) = vpc.state() {
                    m.insert("State".into(), json!(st.as_str()));
                }
                if let Some(cidr) = vpc.cidr_block() {
                    m.insert("CidrBlock".into(), json!(cidr));
                }
                m.insert("IsDefault".into(), json!(vpc.is_default()));
                if !vpc.tags().is_empty() {
                    m.insert("Tags".into(), tags_value(vpc.tags()));
                }
                items.push(Value::Object(m));
            }
            pages.push(json!({ "Vpcs": items }));

            token = resp.next_token().map(str::to_string);
            if token.is_none() {
                break;
            }
        }
        Ok(pages)
    }
}

pub struct DescribeSubnets;

#[async_trait]
impl ApiCall for DescribeSubnets {
    async fn fetch_pages(&self, conf: &SdkConfig) -> Result<Vec<Value>> {
        let client = ec2::Client::new(conf);
        let mut pages = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut req = client.describe_subnets();
            if let Some(t) = token.as_deref() {
                req = req.next_token(t);
            }
            let resp = req.send().await?;

            let mut items = Vec::new();
            for subnet in resp.subnets() {
                let mut m = JsonMap::new();
                if let Some(id) = subnet.subnet_id() {
                    m.insert("SubnetId".into(), json!(id));
                }
                if let Some(arn) = subnet.subnet_arn() {
                    m.insert("SubnetArn".into(), json!(arn));
                }
                if let Some(vpc) = subnet.vpc_id() {
                    m.insert("VpcId".into(), json!(vpc));
                }
                if let Some(st) = subnet.state() {
                    m.insert("State".into(), json!(st.as_str()));
                }
                if let Some(az) = subnet.availability_zone() {
                    m.insert("AvailabilityZone".into(), json!(az));
                }
                if let Some(cidr) = subnet.cidr_block() {
                    m.insert("CidrBlock".into(), json!(cidr));
                }
                if !subnet.tags().is_empty() {
                    m.insert("Tags".into(), tags_value(subnet.tags()));
                }
                items.push(Value::Object(m));
            }
            pages.push(json!({ "Subnets": items }));

            token = resp.next_token().map(str::to_string);
            if token.is_none() {
                break;
            }
        }
        Ok(pages)
    }
}

pub struct DescribeSecurityGroups;

#[async_trait]
impl ApiCall for DescribeSecurityGroups {
    async fn fetch_pages(&self, conf: &SdkConfig) -> Result<Vec<Value>> {
        let client = ec2::Client::new(conf);
        let mut pages = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut req = client.describe_security_groups();
            if let Some(t) = token.as_deref() {
                req = req.next_token(t);
            }
            let resp = req.send().await?;

            let mut items = Vec::new();
            for sg in resp.security_groups() {
                let mut m = JsonMap::new();
                if let Some(id) = sg.group_id() {
                    m.insert("GroupId".into(), json!(id));
                }
                if let Some(name) = sg.group_name() {
                    m.insert("GroupName".into(), json!(name));
                }
                if let Some(desc) = sg.description() {
                    m.insert("Description".into(), json!(desc));
                }
                if let Some(vpc) = sg.vpc_id() {
                    m.insert("VpcId".into(), json!(vpc));
                }
                if !sg.tags().is_empty() {
                    m.insert("Tags".into(), tags_value(sg.tags()));
                }
                items.push(Value::Object(m));
            }
            pages.push(json!({ "SecurityGroups": items }));

            token = resp.next_token().map(str::to_string);
            if token.is_none() {
                break;
            }
        }
        Ok(pages)
    }
}
