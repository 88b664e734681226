use std::collections::BTreeMap;

use builder_desk_backend::allocations::AllocationInput;
use builder_desk_backend::attendance::{AttendanceInput, AttendanceRecord};
use builder_desk_backend::directory::NewMember;
use builder_desk_backend::events::{EventPatch, NewEvent};
use builder_desk_backend::{Desk, DeskError};
use builder_desk_scheduler::{Category, EventStatus, Instant, Slot, Tier};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method, Request, Response, StatusCode};
use http_body::Body;
use http_body_util::{BodyExt as _, Full, Limited};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};
use uuid::Uuid;

use crate::error::AppError;

const BODY_LIMIT: usize = 1024 * 1024;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Deserialize)]
struct EventsQuery {
    #[serde(default, rename = "type")]
    category: Option<Category>,
    #[serde(default)]
    status: Option<EventStatus>,
}

#[derive(Deserialize)]
struct SlotsQuery {
    start: Instant,
    end: Instant,
}

#[derive(Deserialize)]
struct TierQuery {
    #[serde(default, rename = "type")]
    tier: Option<Tier>,
}

#[derive(Deserialize)]
struct BuildersQuery {
    #[serde(default)]
    department: Option<String>,
}

#[derive(Deserialize)]
struct StatusQuery {
    #[serde(default)]
    builder_id: Option<Uuid>,
    #[serde(default)]
    time_slot_start: Option<Instant>,
}

#[derive(Deserialize)]
struct SaveAllocations {
    allocations: Vec<AllocationInput>,
}

#[derive(Deserialize)]
struct ToggleRequest {
    #[serde(default)]
    builder_id: Option<Uuid>,
    #[serde(default)]
    builder_ids: Vec<Uuid>,
    slot: Slot,
}

#[derive(Deserialize)]
struct DepartmentToggle {
    department: String,
    slot: Slot,
}

#[derive(Deserialize)]
struct MarkBatch {
    records: Vec<AttendanceInput>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Outcome {
    Marked { record: AttendanceRecord },
    Failed { error: String },
}

pub fn keyed<T: Serialize>(key: &'static str, value: T) -> BTreeMap<&'static str, T> {
    BTreeMap::from([(key, value)])
}

pub fn json_response<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let (status, body) = match serde_json::to_vec(value) {
        Ok(body) => (status, Bytes::from(body)),
        Err(error) => {
            error!(%error, "failed to serialize response");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Bytes::from_static(br#"{"error":"failed to serialize response"}"#),
            )
        }
    };
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn parse_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::InvalidId(id.to_owned()))
}

async fn read_json<B, T>(request: Request<B>) -> Result<T, AppError>
where
    B: Body,
    B::Error: Into<BoxError>,
    T: DeserializeOwned,
{
    let body = Limited::new(request.into_body(), BODY_LIMIT)
        .collect()
        .await
        .map_err(|error| AppError::Body(error.to_string()))?
        .to_bytes();
    Ok(serde_json::from_slice(&body)?)
}

#[instrument(skip_all, fields(method = %request.method(), path = %request.uri().path()))]
pub async fn route<B>(desk: &Desk, request: Request<B>) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    match dispatch(desk, request).await {
        Ok(response) => {
            debug!(status = %response.status(), "handled request");
            response
        }
        Err(error) => {
            let status = error.status();
            if status.is_server_error() {
                error!(%error, "request failed");
            } else {
                debug!(%error, %status, "request rejected");
            }
            error.into_response()
        }
    }
}

#[allow(clippy::too_many_lines)]
async fn dispatch<B>(desk: &Desk, request: Request<B>) -> Result<Response<Full<Bytes>>, AppError>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let query = request.uri().query().unwrap_or_default().to_owned();
    let segments: Vec<&str> = path.split('/').filter(|segment| !segment.is_empty()).collect();

    let response = match (&method, segments.as_slice()) {
        (&Method::GET, ["slots"]) => {
            let SlotsQuery { start, end } = serde_urlencoded::from_str(&query)?;
            json_response(
                StatusCode::OK,
                &keyed("slots", Desk::partition_slots(start, end)?),
            )
        }
        (&Method::GET, ["events"]) => {
            let EventsQuery { category, status } = serde_urlencoded::from_str(&query)?;
            json_response(
                StatusCode::OK,
                &keyed("events", desk.list_events(category, status).await?),
            )
        }
        (&Method::POST, ["events"]) => {
            let new: NewEvent = read_json(request).await?;
            json_response(
                StatusCode::CREATED,
                &keyed("event", desk.create_event(new).await?),
            )
        }
        (&Method::GET, ["events", id]) => json_response(
            StatusCode::OK,
            &keyed("event", desk.get_event(parse_id(id)?).await?),
        ),
        (&Method::PATCH, ["events", id]) => {
            let id = parse_id(id)?;
            let patch: EventPatch = read_json(request).await?;
            json_response(StatusCode::OK, &desk.update_event(id, patch).await?)
        }
        (&Method::DELETE, ["events", id]) => {
            desk.delete_event(parse_id(id)?).await?;
            json_response(StatusCode::OK, &keyed("ok", true))
        }
        (&Method::GET, ["events", id, "slots"]) => json_response(
            StatusCode::OK,
            &keyed("slots", desk.event_slots(parse_id(id)?).await?),
        ),
        (&Method::GET, ["events", id, "allocations"]) => json_response(
            StatusCode::OK,
            &keyed("allocations", desk.list_allocations(parse_id(id)?).await?),
        ),
        (&Method::POST, ["events", id, "allocations"]) => {
            let id = parse_id(id)?;
            let SaveAllocations { allocations } = read_json(request).await?;
            json_response(
                StatusCode::OK,
                &keyed("allocations", desk.save_allocations(id, allocations).await?),
            )
        }
        (&Method::POST, ["events", id, "allocations", "toggle"]) => {
            let id = parse_id(id)?;
            let ToggleRequest {
                builder_id,
                builder_ids,
                slot,
            } = read_json(request).await?;
            match builder_id {
                Some(builder_id) => json_response(
                    StatusCode::OK,
                    &desk.toggle_allocation(id, builder_id, &slot).await?,
                ),
                None if !builder_ids.is_empty() => json_response(
                    StatusCode::OK,
                    &desk.toggle_group_allocation(id, &builder_ids, &slot).await?,
                ),
                None => {
                    return Err(DeskError::Validation(
                        "builder_id or builder_ids is required".to_owned(),
                    )
                    .into());
                }
            }
        }
        (&Method::POST, ["events", id, "allocations", "department"]) => {
            let id = parse_id(id)?;
            let DepartmentToggle { department, slot } = read_json(request).await?;
            json_response(
                StatusCode::OK,
                &desk
                    .toggle_department_allocation(id, &department, &slot)
                    .await?,
            )
        }
        (&Method::GET, ["events", id, "attendance"]) => {
            let id = parse_id(id)?;
            let status_query: StatusQuery = serde_urlencoded::from_str(&query)?;
            match status_query {
                StatusQuery {
                    builder_id: Some(builder_id),
                    time_slot_start: Some(slot_start),
                } => json_response(
                    StatusCode::OK,
                    &keyed(
                        "status",
                        desk.attendance_status(id, builder_id, slot_start).await?,
                    ),
                ),
                _ => json_response(
                    StatusCode::OK,
                    &keyed("attendance", desk.list_attendance(id).await?),
                ),
            }
        }
        (&Method::POST, ["events", id, "attendance"]) => {
            let id = parse_id(id)?;
            let input: AttendanceInput = read_json(request).await?;
            let record = desk
                .batch_mark_attendance(id, vec![input])
                .await?
                .into_iter()
                .next()
                .unwrap_or_else(|| Err(DeskError::Validation("nothing to mark".to_owned())))?;
            json_response(StatusCode::OK, &keyed("attendance", record))
        }
        (&Method::PATCH, ["events", id, "attendance"]) => {
            let id = parse_id(id)?;
            let MarkBatch { records } = read_json(request).await?;
            let results: Vec<Outcome> = desk
                .batch_mark_attendance(id, records)
                .await?
                .into_iter()
                .map(|outcome| match outcome {
                    Ok(record) => Outcome::Marked { record },
                    Err(error) => Outcome::Failed {
                        error: error.to_string(),
                    },
                })
                .collect();
            json_response(StatusCode::OK, &keyed("results", results))
        }
        (&Method::GET, ["events", id, "report"]) => json_response(
            StatusCode::OK,
            &desk.attendance_report(parse_id(id)?).await?,
        ),
        (&Method::GET, ["builders"]) => {
            let BuildersQuery { department } = serde_urlencoded::from_str(&query)?;
            let builders = match department {
                Some(department) => desk.department_members(&department).await?,
                None => desk.list_members().await?,
            };
            json_response(StatusCode::OK, &keyed("builders", builders))
        }
        (&Method::POST, ["builders"]) => {
            let new: NewMember = read_json(request).await?;
            json_response(
                StatusCode::CREATED,
                &keyed("builder", desk.register_member(new).await?),
            )
        }
        (&Method::GET, ["builders", "next-number"]) => {
            let TierQuery { tier } = serde_urlencoded::from_str(&query)?;
            let tier = tier.ok_or_else(|| DeskError::Validation("type is required".to_owned()))?;
            json_response(
                StatusCode::OK,
                &keyed("next_number", desk.next_builder_number(tier).await?),
            )
        }
        (&Method::GET, ["builders", "departments"]) => json_response(
            StatusCode::OK,
            &keyed("departments", desk.departments().await?),
        ),
        (&Method::GET, ["builders", id]) => json_response(
            StatusCode::OK,
            &keyed("builder", desk.get_member(parse_id(id)?).await?),
        ),
        (&Method::GET, ["verify", code]) => {
            let TierQuery { tier } = serde_urlencoded::from_str(&query)?;
            json_response(StatusCode::OK, &desk.verify_card(code, tier).await?)
        }
        _ => {
            return Err(AppError::RouteNotFound {
                method: method.clone(),
                path: path.clone(),
            });
        }
    };
    Ok(response)
}
