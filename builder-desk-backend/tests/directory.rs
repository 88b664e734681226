mod common;

use builder_desk_backend::directory::NewMember;
use builder_desk_backend::{DeskError, ErrorKind};
use builder_desk_scheduler::Tier;
use common::{member, memory_desk};

fn new_member(name: &str, tier: Tier, number: Option<i32>, department: Option<&str>) -> NewMember {
    NewMember {
        name: name.to_owned(),
        tier,
        builder_number: number,
        department: department.map(ToOwned::to_owned),
        email: Some("  ".to_owned()),
        registration_number: None,
    }
}

#[tokio::test]
async fn numbers_count_up_per_tier() {
    let desk = memory_desk();
    assert_eq!(desk.next_builder_number(Tier::Executive).await.unwrap(), 1);

    let first = member(&desk, "Ada", Tier::Executive, Some("Tech")).await;
    let second = member(&desk, "Grace", Tier::Executive, Some("Tech")).await;
    let core = member(&desk, "Linus", Tier::Core, Some("Tech")).await;
    assert_eq!(first.builder_number, 1);
    assert_eq!(second.builder_number, 2);
    assert_eq!(core.builder_number, 1);
    assert_eq!(first.email, None);

    let explicit = desk
        .register_member(new_member("Ken", Tier::Executive, Some(10), Some("Events")))
        .await
        .unwrap();
    assert_eq!(explicit.builder_number, 10);
    assert_eq!(desk.next_builder_number(Tier::Executive).await.unwrap(), 11);
}

#[tokio::test]
async fn a_taken_number_is_a_conflict() {
    let desk = memory_desk();
    member(&desk, "Ada", Tier::Executive, Some("Tech")).await;
    let error = desk
        .register_member(new_member("Grace", Tier::Executive, Some(1), Some("Tech")))
        .await
        .unwrap_err();
    assert!(matches!(error, DeskError::DuplicateBuilderNumber(ref code) if code == "EC1"));
    assert_eq!(error.kind(), ErrorKind::Conflict);

    // same number, other tier
    desk.register_member(new_member("Grace", Tier::Core, Some(1), Some("Tech")))
        .await
        .unwrap();
}

#[tokio::test]
async fn departments_follow_the_tier_rules() {
    let desk = memory_desk();
    let missing = desk
        .register_member(new_member("Ada", Tier::Core, None, None))
        .await
        .unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::Validation);

    let forbidden = desk
        .register_member(new_member("Ada", Tier::General, None, Some("Tech")))
        .await
        .unwrap_err();
    assert_eq!(forbidden.kind(), ErrorKind::Validation);

    let zero = desk
        .register_member(new_member("Ada", Tier::General, Some(0), None))
        .await
        .unwrap_err();
    assert_eq!(zero.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn cards_verify_with_and_without_prefix() {
    let desk = memory_desk();
    let ada = member(&desk, "Ada", Tier::Executive, Some("Tech")).await;
    member(&desk, "Grace", Tier::Core, Some("Tech")).await;
    member(&desk, "Ken", Tier::Core, Some("Tech")).await;

    let verified = desk.verify_card("EC1", None).await.unwrap();
    assert!(verified.valid);
    assert_eq!(verified.builder.unwrap().id, ada.id);

    let verified = desk.verify_card("1", Some(Tier::Executive)).await.unwrap();
    assert_eq!(verified.builder.map(|builder| builder.name).as_deref(), Some("Ada"));

    // CC2 exists only once, so the bare number is enough
    let verified = desk.verify_card("2", None).await.unwrap();
    assert_eq!(verified.builder.map(|builder| builder.name).as_deref(), Some("Ken"));

    // EC1 and CC1 both exist
    let ambiguous = desk.verify_card("1", None).await.unwrap_err();
    assert_eq!(ambiguous.kind(), ErrorKind::Validation);

    let unknown = desk.verify_card("JC9", None).await.unwrap();
    assert!(!unknown.valid);
    assert!(unknown.builder.is_none());

    let garbage = desk.verify_card("EC", None).await.unwrap_err();
    assert_eq!(garbage.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn listing_and_departments() {
    let desk = memory_desk();
    let junior = member(&desk, "Tim", Tier::Junior, Some("Media")).await;
    let general = member(&desk, "Linus", Tier::General, None).await;
    let core = member(&desk, "Grace", Tier::Core, Some("Tech")).await;
    let executive = member(&desk, "Ada", Tier::Executive, Some("Tech")).await;
    member(&desk, "Ken", Tier::Core, Some("Events")).await;

    let listed: Vec<_> = desk
        .list_members()
        .await
        .unwrap()
        .into_iter()
        .map(|member| member.id)
        .collect();
    assert_eq!(listed[0], general.id);
    assert_eq!(listed[1], executive.id);
    assert_eq!(listed[4], junior.id);

    assert_eq!(desk.departments().await.unwrap(), ["Events", "Tech"]);

    let tech: Vec<_> = desk
        .department_members("Tech")
        .await
        .unwrap()
        .into_iter()
        .map(|member| member.id)
        .collect();
    assert_eq!(tech, [executive.id, core.id]);
    assert!(desk.department_members("Media").await.unwrap().is_empty());
}
