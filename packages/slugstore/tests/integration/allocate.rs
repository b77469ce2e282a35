use std::collections::HashSet;

use sea_orm::EntityTrait;

use crate::common::*;
use slugstore::entity::slug;
use slugstore::{SlugError, Sluggable};

mod generation {
    use super::*;

    #[tokio::test]
    async fn applies_the_slugifier_to_the_generated_text() {
        let app = TestDb::new().await;
        let user = User::new("Sancho", "Sample");

        let row = app.service().allocate(&user, &names()).await.unwrap();

        assert_eq!(row.slug, "sancho");
        assert!(row.active);
        assert_eq!(row.owner_ref(), user.owner_ref());
        assert!(row.created_at.is_some());
    }

    #[tokio::test]
    async fn generator_may_combine_fields() {
        let app = TestDb::new().await;
        let config = user_config()
            .generator(|u: &User| {
                Some(format!(
                    "{} {}",
                    u.first_name.as_deref()?,
                    u.last_name.as_deref()?
                ))
            })
            .build()
            .unwrap();

        let row = app
            .service()
            .allocate(&User::new("Foo", "Bar"), &config)
            .await
            .unwrap();

        assert_eq!(row.slug, "foo-bar");
    }

    #[tokio::test]
    async fn first_non_empty_generator_wins() {
        let app = TestDb::new().await;
        let config = user_config()
            .generator(|u: &User| u.gender.clone())
            .generator(|u: &User| u.last_name.clone())
            .build()
            .unwrap();

        let row = app
            .service()
            .allocate(&User::new("Foo", "Bar"), &config)
            .await
            .unwrap();

        assert_eq!(row.slug, "bar");
    }

    #[tokio::test]
    async fn fails_when_no_generator_produces_text() {
        let app = TestDb::new().await;
        let user = User {
            id: 9_001,
            ..Default::default()
        };

        let result = app.service().allocate(&user, &names()).await;

        assert!(matches!(result, Err(SlugError::GenerationExhausted(owner)) if owner == user.owner_ref()));
        assert_eq!(app.total_rows().await, 0);
    }

    #[tokio::test]
    async fn truncates_to_the_maximum_length() {
        let app = TestDb::new().await;
        let user = User::new(&"A".repeat(500), "Bar");

        let row = app.service().allocate(&user, &names()).await.unwrap();

        assert_eq!(row.slug, "a".repeat(126));
    }
}

mod reuse {
    use super::*;

    #[tokio::test]
    async fn does_not_create_a_row_when_an_owned_slug_matches() {
        let app = TestDb::new().await;
        let mut user = User::new("Foo", "Bar");
        let service = app.service();
        service.allocate(&user, &names()).await.unwrap();
        app.insert_slug(&user.owner_ref(), "bar", false).await;

        user.last_name = Some("Baz".into());
        let row = service.allocate(&user, &names()).await.unwrap();

        assert_eq!(row.slug, "foo");
        let rows = app.rows_for(&user.owner_ref()).await;
        assert_eq!(rows.len(), 2);
        let bar = rows.iter().find(|r| r.slug == "bar").unwrap();
        assert!(!bar.active);
    }

    #[tokio::test]
    async fn allocating_twice_is_idempotent() {
        let app = TestDb::new().await;
        let user = User::new("Foo", "Bar");
        let service = app.service();

        let first = service.allocate(&user, &names()).await.unwrap();
        let second = service.allocate(&user, &names()).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.slug, "foo");
        assert_eq!(app.rows_for(&user.owner_ref()).await.len(), 1);
    }

    #[tokio::test]
    async fn switching_back_reactivates_the_old_row() {
        let app = TestDb::new().await;
        let mut user = User::new("Foo", "Bar");
        let service = app.service();
        let original = service.allocate(&user, &names()).await.unwrap();

        user.first_name = Some("Qux".into());
        let renamed = service.allocate(&user, &names()).await.unwrap();
        assert_eq!(renamed.slug, "qux");

        user.first_name = Some("Foo".into());
        let restored = service.allocate(&user, &names()).await.unwrap();

        assert_eq!(restored.id, original.id);
        assert!(restored.active);
        let rows = app.rows_for(&user.owner_ref()).await;
        assert_eq!(rows.len(), 2);
        assert!(!rows.iter().find(|r| r.slug == "qux").unwrap().active);
        assert_eq!(app.active_count(&user.owner_ref()).await, 1);
    }

    #[tokio::test]
    async fn higher_priority_owned_slug_is_preferred() {
        let app = TestDb::new().await;
        let user = User::new("Foo", "Bar");
        app.insert_slug(&user.owner_ref(), "bar", true).await;
        app.insert_slug(&user.owner_ref(), "foo", false).await;

        let row = app.service().allocate(&user, &names()).await.unwrap();

        assert_eq!(row.slug, "foo");
        let rows = app.rows_for(&user.owner_ref()).await;
        assert_eq!(rows.len(), 2);
        assert!(!rows.iter().find(|r| r.slug == "bar").unwrap().active);
    }
}

mod uniqueness {
    use super::*;

    #[tokio::test]
    async fn ignores_slugs_of_other_owner_types() {
        let app = TestDb::new().await;
        let service = app.service();

        let abuser = service
            .allocate(&Abuser::new("Foo", "Bar"), &abuser_names())
            .await
            .unwrap();
        let user = service
            .allocate(&User::new("Foo", "Bar"), &names())
            .await
            .unwrap();

        assert_eq!(abuser.slug, "foo");
        assert_eq!(user.slug, "foo");
    }

    #[tokio::test]
    async fn third_owner_falls_back_to_the_id_suffix() {
        let app = TestDb::new().await;
        let service = app.service();
        let users = [
            User::new("Foo", "Bar"),
            User::new("Foo", "Bar"),
            User::new("Foo", "Bar"),
        ];

        let mut slugs = Vec::new();
        for user in &users {
            slugs.push(service.allocate(user, &names()).await.unwrap().slug);
        }

        assert_eq!(slugs[0], "foo");
        assert_eq!(slugs[1], "bar");
        assert_eq!(slugs[2], format!("foo;{}", users[2].id));
    }

    #[tokio::test]
    async fn last_resort_uses_the_first_non_empty_generator() {
        let app = TestDb::new().await;
        let config = user_config()
            .generator(|u: &User| u.gender.clone())
            .generator(|u: &User| u.first_name.clone())
            .generator(|u: &User| u.last_name.clone())
            .build()
            .unwrap();
        let service = app.service();
        let users = [
            User::new("Foo", "Bar"),
            User::new("Foo", "Bar"),
            User::new("Foo", "Bar"),
        ];

        let mut last = None;
        for user in &users {
            last = Some(service.allocate(user, &config).await.unwrap());
        }

        assert_eq!(last.unwrap().slug, format!("foo;{}", users[2].id));
    }

    #[tokio::test]
    async fn custom_id_separator() {
        let app = TestDb::new().await;
        let config = user_config()
            .generator(|u: &User| u.first_name.clone())
            .id_separator(":")
            .build()
            .unwrap();
        let service = app.service();
        let first = User::new("Foo", "Bar");
        let second = User::new("Foo", "Bar");

        service.allocate(&first, &config).await.unwrap();
        let row = service.allocate(&second, &config).await.unwrap();

        assert_eq!(row.slug, format!("foo:{}", second.id));
    }

    #[tokio::test]
    async fn shortens_the_text_left_of_the_separator() {
        let app = TestDb::new().await;
        let service = app.service();
        let first = User::new(&"A".repeat(500), "Bar");
        let second = User::new(&"A".repeat(500), "Bar");
        let config = user_config()
            .generator(|u: &User| u.first_name.clone())
            .build()
            .unwrap();

        service.allocate(&first, &config).await.unwrap();
        let row = service.allocate(&second, &config).await.unwrap();

        let suffix = format!(";{}", second.id);
        assert_eq!(row.slug.chars().count(), 126);
        assert!(row.slug.ends_with(&suffix));
        let prefix = row.slug.trim_end_matches(&suffix);
        assert!(!prefix.is_empty());
        assert!(prefix.chars().all(|c| c == 'a'));
    }

    #[tokio::test]
    async fn scoped_slugs_are_unique_per_scope_only() {
        let app = TestDb::new().await;
        let config = user_config()
            .generator(|u: &User| u.first_name.clone())
            .generator(|u: &User| u.last_name.clone())
            .scope(|u: &User| u.callsign.clone())
            .build()
            .unwrap();
        let service = app.service();

        let a = User::new("Foo", "Bar").with_callsign("one/");
        let b = User::new("Foo", "Bar").with_callsign("two/");
        let c = User::new("Foo", "Bar").with_callsign("one/");

        assert_eq!(service.allocate(&a, &config).await.unwrap().slug, "foo");
        assert_eq!(service.allocate(&b, &config).await.unwrap().slug, "foo");
        let row = service.allocate(&c, &config).await.unwrap();
        assert_eq!(row.slug, "bar");
        assert_eq!(row.scope.as_deref(), Some("one/"));
    }

    #[tokio::test]
    async fn scope_closure_may_derive_from_a_field() {
        let app = TestDb::new().await;
        let config = user_config()
            .generator(|u: &User| u.first_name.clone())
            .generator(|u: &User| u.last_name.clone())
            .scope(|u: &User| {
                let first = u.callsign.as_deref()?.chars().next()?;
                Some(format!("{first}/"))
            })
            .build()
            .unwrap();
        let service = app.service();

        let maverick = User::new("Foo", "Bar").with_callsign("maverick");
        let goose = User::new("Foo", "Bar").with_callsign("goose");
        let merlin = User::new("Foo", "Bar").with_callsign("merlin");

        assert_eq!(service.allocate(&maverick, &config).await.unwrap().slug, "foo");
        assert_eq!(service.allocate(&goose, &config).await.unwrap().slug, "foo");
        let row = service.allocate(&merlin, &config).await.unwrap();
        assert_eq!(row.slug, "bar");
        assert_eq!(row.path(), "m/bar");
    }

    #[tokio::test]
    async fn every_row_is_unique_within_type_and_scope() {
        let app = TestDb::new().await;
        let config = user_config()
            .generator(|u: &User| u.first_name.clone())
            .generator(|u: &User| u.last_name.clone())
            .scope(|u: &User| u.callsign.clone())
            .build()
            .unwrap();
        let service = app.service();

        for i in 0..12 {
            let callsign = if i % 2 == 0 { "even/" } else { "odd/" };
            let mut user = User::new("Foo", "Bar").with_callsign(callsign);
            service.allocate(&user, &config).await.unwrap();
            user.first_name = Some(format!("Name {}", i % 3));
            service.allocate(&user, &config).await.unwrap();
        }

        let rows = slug::Entity::find().all(&app.db).await.unwrap();
        let mut seen = HashSet::new();
        for row in &rows {
            assert!(
                seen.insert((row.owner_type.clone(), row.scope.clone(), row.slug.clone())),
                "duplicate slug {:?} in scope {:?}",
                row.slug,
                row.scope
            );
        }
    }
}

mod blacklist {
    use super::*;

    #[tokio::test]
    async fn skips_blacklisted_candidates() {
        let app = TestDb::new().await;

        let row = app
            .service()
            .allocate(&User::new("New", "Bar"), &names())
            .await
            .unwrap();

        assert_eq!(row.slug, "bar");
    }

    #[tokio::test]
    async fn honours_a_custom_blacklist() {
        let app = TestDb::new().await;
        let config = user_config()
            .generator(|u: &User| u.first_name.clone())
            .generator(|u: &User| u.last_name.clone())
            .blacklist(["foo", "bar"])
            .build()
            .unwrap();

        let row = app
            .service()
            .allocate(&User::new("Foo", "Baz"), &config)
            .await
            .unwrap();

        assert_eq!(row.slug, "baz");
    }

    #[tokio::test]
    async fn fails_when_every_candidate_is_excluded() {
        let app = TestDb::new().await;
        let user = User::new("F", "F");
        let config = user_config()
            .generator(|_: &User| Some("f".into()))
            .blacklist(["f"])
            .max_length(1)
            .build()
            .unwrap();

        let result = app.service().allocate(&user, &config).await;

        assert!(matches!(result, Err(SlugError::AllocationExhausted { .. })));
        assert_eq!(app.total_rows().await, 0);
    }
}

mod history {
    use super::*;

    #[tokio::test]
    async fn new_slug_deactivates_the_previous_one() {
        let app = TestDb::new().await;
        let mut user = User::new("Foo", "Bar");
        let service = app.service();
        let old = service.allocate(&user, &names()).await.unwrap();

        user.first_name = Some("Qux".into());
        let new = service.allocate(&user, &names()).await.unwrap();

        assert_ne!(old.id, new.id);
        let rows = service.history(&user.owner_ref()).await.unwrap();
        assert_eq!(
            rows.iter().map(|r| (r.slug.as_str(), r.active)).collect::<Vec<_>>(),
            vec![("foo", false), ("qux", true)]
        );
    }

    #[tokio::test]
    async fn owner_never_has_more_than_one_active_row() {
        let app = TestDb::new().await;
        let mut user = User::new("Foo", "Bar");
        let service = app.service();

        for name in ["Foo", "Baz", "Qux", "Foo", "Zap", "Baz"] {
            user.first_name = Some(name.into());
            service.allocate(&user, &names()).await.unwrap();
            assert_eq!(app.active_count(&user.owner_ref()).await, 1);
        }

        assert_eq!(app.rows_for(&user.owner_ref()).await.len(), 4);
    }
}

mod cache {
    use super::*;

    #[tokio::test]
    async fn allocation_refreshes_the_current_slug() {
        let app = TestDb::new().await;
        let mut user = User::new("Foo", "Bar");
        let service = app.service();
        let owner = user.owner_ref();

        assert_eq!(service.current_slug(&owner).await.unwrap(), None);

        service.allocate(&user, &names()).await.unwrap();
        assert_eq!(service.current_slug(&owner).await.unwrap().as_deref(), Some("foo"));

        user.first_name = Some("Qux".into());
        service.allocate(&user, &names()).await.unwrap();
        assert_eq!(service.current_slug(&owner).await.unwrap().as_deref(), Some("qux"));
    }

    #[tokio::test]
    async fn current_path_includes_the_scope() {
        let app = TestDb::new().await;
        let config = user_config()
            .generator(|u: &User| u.first_name.clone())
            .scope(|_: &User| Some("test/".into()))
            .build()
            .unwrap();
        let user = User::new("Doctor", "Who");
        let service = app.service();

        service.allocate(&user, &config).await.unwrap();

        assert_eq!(
            service.current_path(&user.owner_ref()).await.unwrap().as_deref(),
            Some("test/doctor")
        );
        assert_eq!(
            service.current_slug(&user.owner_ref()).await.unwrap().as_deref(),
            Some("doctor")
        );
    }
}
