//! Decision properties and end-to-end scenarios over a loaded store.

use atlas_rbac::{
    base_path_from, Action, EvalContext, FeatureKey, GlobalOverride, Layer, PagePermissions,
    PermissionRecord, PermissionSnapshot, Registry, SessionOverrides, UserId,
};
use atlas_test_utils::fixtures::{
    override_row, overrides_response, permissions_response, role_row, sales_viewer, store_with,
    super_user,
};
use atlas_test_utils::{assert_err, assert_ok, ScriptedBackend};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

fn user() -> Option<UserId> {
    Some(UserId::new("u-100"))
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::View),
        Just(Action::Create),
        Just(Action::Edit),
        Just(Action::Delete),
        "[a-z]{3,8}".prop_map(|name| Action::parse(&name)),
    ]
}

proptest! {
    #[test]
    fn super_user_is_always_allowed(
        module in "[a-z]{1,8}",
        feature in "[a-z-]{1,12}",
        action in action_strategy(),
        via_module in any::<bool>(),
    ) {
        let snapshot = if via_module {
            PermissionSnapshot::from_parts(None, vec!["*".to_string()], vec![], HashSet::new())
        } else {
            PermissionSnapshot::from_parts(
                None,
                Vec::new(),
                vec![PermissionRecord::uniform(FeatureKey::wildcard(), false)],
                HashSet::new(),
            )
        };
        let mut pages = HashMap::new();
        pages.insert("/x/y".to_string(), PagePermissions::default());
        let ctx = EvalContext {
            snapshot: &snapshot,
            registry: &Registry::builtin(),
            session: &SessionOverrides::new(),
            global: &GlobalOverride::default(),
            page_cache: &pages,
            route: Some("/x/y"),
        };

        let key = FeatureKey::canonical(&module, &feature);
        let decision = ctx.can_perform_action(key.as_str(), &action);
        prop_assert!(decision.granted);
        prop_assert_eq!(decision.layer, Layer::Super);
    }
}

#[tokio::test]
async fn super_user_via_store() {
    let (_, store) = store_with(ScriptedBackend::new().with_permissions(super_user()));
    assert_ok!(store.set_user(user()).await);

    assert!(store.is_super());
    assert!(store.can_perform_action("hr:payroll", &Action::Delete));
    assert!(store.can_access_path("/finance/journals/new", &Action::Create));
}

#[tokio::test]
async fn highest_layer_wins() {
    let backend = ScriptedBackend::new().with_permissions(permissions_response(
        &["sales"],
        vec![role_row("sales", "customers", [false, false, false, false])],
        &["sales:customers"],
    ));
    let (_, store) = store_with(backend);
    assert_ok!(store.set_user(user()).await);

    assert_ok!(store.set_action_session_override("sales:customers", &Action::Edit, Some(true)));
    assert_ok!(store.set_global_override(&Action::Edit, true));
    store.enter_route("/sales/customers/88");
    store.set_page_override("/sales/customers", &Action::View, false);

    let decision = store.check_action("sales:customers", &Action::Edit);
    assert!(!decision.granted);
    assert_eq!(decision.layer, Layer::PageCache);

    store.enter_route("/sales/orders");
    let decision = store.check_action("sales:customers", &Action::Edit);
    assert!(decision.granted);
    assert_eq!(decision.layer, Layer::SessionOverride);
}

#[tokio::test]
async fn session_override_keeps_view_consistent() {
    let (_, store) = store_with(ScriptedBackend::new().with_permissions(sales_viewer()));
    assert_ok!(store.set_user(user()).await);

    assert_ok!(store.set_action_session_override("sales:orders", &Action::Edit, Some(true)));
    let flags = store.session_override("sales:orders").unwrap();
    assert_eq!(flags.can_view, Some(true));

    assert_ok!(store.set_action_session_override("sales:orders", &Action::View, Some(false)));
    let flags = store.session_override("sales:orders").unwrap();
    assert_eq!(flags.can_create, Some(false));
    assert_eq!(flags.can_edit, Some(false));
    assert_eq!(flags.can_delete, Some(false));
}

#[tokio::test]
async fn bare_and_canonical_keys_resolve_alike() {
    let backend = ScriptedBackend::new().with_permissions(permissions_response(
        &["sales"],
        vec![role_row("sales", "customers", [true, true, false, false])],
        &[],
    ));
    let (_, store) = store_with(backend);
    assert_ok!(store.set_user(user()).await);

    let snapshot = store.snapshot();
    let record = snapshot.lookup("sales:customers", None).unwrap();
    assert_eq!(record.key.as_str(), "sales:customers");
    assert_eq!(snapshot.lookup("customers", Some("sales")), Some(record));
}

#[test]
fn detail_routes_share_the_list_base_path() {
    let expected = "/sales/invoices";
    assert_eq!(base_path_from("/sales/invoices/42"), expected);
    assert_eq!(base_path_from("/sales/invoices/new"), expected);
    assert_eq!(base_path_from("/sales/invoices"), expected);
    assert_eq!(base_path_from("/sales/invoices/9f3b2a7c-44aa-4b1e-9d0c-5e6f7a8b9c0d"), expected);
    assert_eq!(base_path_from("/sales"), "/sales");
}

#[tokio::test]
async fn purchase_alias_accepts_either_grant() {
    for grant in ["purchase:direct-purchase", "purchase:direct-purchases"] {
        let backend =
            ScriptedBackend::new().with_permissions(permissions_response(&["purchase"], vec![], &[grant]));
        let (_, store) = store_with(backend);
        assert_ok!(store.set_user(user()).await);

        assert!(!store.is_super());
        assert!(store.can_access_feature_key("purchase", "direct-purchase"), "{}", grant);
        assert!(store.can_access_feature_key("purchase", "direct-purchases"), "{}", grant);
        assert!(!store.can_access_feature_key("purchase", "suppliers"));
    }
}

#[tokio::test]
async fn primary_load_failure_fails_closed() {
    let (backend, store) = store_with(ScriptedBackend::new());

    let err = assert_err!(store.set_user(user()).await);
    assert!(matches!(err, atlas_rbac::RbacError::Backend(_)));
    assert_eq!(backend.permission_calls(), 1);
    assert_eq!(backend.override_calls(), 0);

    assert!(store.get_enabled_modules().is_empty());
    assert!(!store.can_perform_action("sales:customers", &Action::View));
    assert!(!store.is_feature_enabled("sales", "customers"));
}

#[tokio::test]
async fn role_defaults_decide_without_overrides() {
    let (_, store) = store_with(ScriptedBackend::new().with_permissions(sales_viewer()));
    assert_ok!(store.set_user(user()).await);

    assert!(store.is_feature_enabled("sales", "customers"));
    assert!(store.can_perform_action("sales:customers", &Action::View));
    assert!(!store.can_perform_action("sales:customers", &Action::Create));
}

#[tokio::test]
async fn user_override_beats_role_default() {
    let backend = ScriptedBackend::new()
        .with_permissions(sales_viewer())
        .with_overrides(
            "u-100",
            overrides_response(vec![override_row(
                Some("sales"),
                "customers",
                [None, Some(true), None, None],
            )]),
        );
    let (_, store) = store_with(backend);
    assert_ok!(store.set_user(user()).await);

    assert!(store.can_perform_action("sales:customers", &Action::Create));
    assert!(store.can_perform_action("sales:customers", &Action::View));
    assert!(!store.can_perform_action("sales:customers", &Action::Delete));
}

#[tokio::test]
async fn global_view_opens_disabled_module_paths() {
    let (_, store) = store_with(ScriptedBackend::new().with_permissions(sales_viewer()));
    assert_ok!(store.set_user(user()).await);
    assert!(!store.can_access_path("/inventory/items", &Action::View));

    assert_ok!(store.set_global_override(&Action::View, true));
    assert!(!store.is_module_enabled("inventory"));
    assert!(store.can_access_path("/inventory/items", &Action::View));
}
